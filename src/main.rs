use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carepay::application::engine::{PayOutcome, PaymentWorkflow, button_label};
use carepay::application::initiation::Initiation;
use carepay::application::verification::{VerificationSession, VerificationState};
use carepay::config::{ApiConfig, DEFAULT_STORE_PATH, DEFAULT_TIMEOUT_SECS, StoreConfig};
use carepay::domain::payment::{Appointment, AppointmentId, VerificationResult};
use carepay::domain::ports::{MarkerStoreBox, SharedMarkerStore};
use carepay::infrastructure::file::JsonFileMarkerStore;
use carepay::interfaces::console::ConsoleRedirector;
use carepay::interfaces::http::assistant::AssistantClient;
use carepay::interfaces::http::client::{ApiClient, StaticToken};
use carepay::interfaces::http::gateway::HttpPaymentGateway;
use carepay::interfaces::http::resources::{ListQuery, Page, Resource, ResourceClient};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use serde::Serialize;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the portal API
    #[arg(long, env = "CAREPAY_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "CAREPAY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// JSON file holding pending-payment markers
    #[arg(long, env = "CAREPAY_STORE", default_value = DEFAULT_STORE_PATH)]
    store_path: PathBuf,

    /// Path to a RocksDB marker database. Requires the `storage-rocksdb` feature.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pay for an appointment, or verify it if payment is already pending
    Pay {
        /// Appointment to pay for, fetched from the API
        #[arg(required_unless_present = "appointment", conflicts_with = "appointment")]
        appointment_id: Option<u64>,
        /// Appointment JSON file, or `-` for stdin, instead of fetching it
        #[arg(long)]
        appointment: Option<PathBuf>,
        /// Email the payment receipt goes to
        #[arg(long, env = "CAREPAY_EMAIL")]
        email: String,
    },
    /// Ask the payment API whether an appointment's payment has settled
    Verify {
        appointment_id: u64,
        /// Reference to check when no pending marker is stored
        #[arg(long)]
        reference: Option<String>,
    },
    /// Verify an appointment only if a payment for it is pending
    Resume { appointment_id: u64 },
    /// Load a patient's appointments and resume any pending payment verification
    Appointments { patient_id: u64 },
    /// List pending-payment markers
    Markers,
    /// List a page of a collection
    List {
        resource: Resource,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Fetch one record
    Get { resource: Resource, id: u64 },
    /// Delete one record
    Delete { resource: Resource, id: u64 },
    /// Ask the patient assistant a question
    Ask { message: String },
}

/// What the payment commands print: the session as the user would see it.
#[derive(Serialize)]
struct SessionReport<'a> {
    appointment_id: AppointmentId,
    state: &'static str,
    label: &'static str,
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_reference: Option<&'a str>,
    result: Option<&'a VerificationResult>,
    /// Appointment as refetched after a confirmed payment.
    #[serde(skip_serializing_if = "Option::is_none")]
    appointment: Option<serde_json::Value>,
}

impl<'a> SessionReport<'a> {
    fn new(
        session: &'a VerificationSession,
        label: &'static str,
        result: Option<&'a VerificationResult>,
    ) -> Self {
        Self {
            appointment_id: session.appointment_id(),
            state: match session.state() {
                VerificationState::Idle { .. } => "idle",
                VerificationState::Verifying { .. } => "verifying",
                VerificationState::Completed => "completed",
            },
            label,
            message: session.last_error(),
            payment_url: None,
            payment_reference: None,
            result,
            appointment: None,
        }
    }

    fn with_initiation(mut self, initiation: &'a Initiation) -> Self {
        self.payment_url = Some(initiation.authorization_url());
        self.payment_reference = initiation.payment_reference();
        self
    }
}

/// Output of `appointments`: one session per card, plus the list as refetched
/// when any payment was confirmed.
#[derive(Serialize)]
struct PatientReport<'a> {
    patient_id: u64,
    sessions: Vec<SessionReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    appointments: Option<Vec<serde_json::Value>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    carepay::telemetry::init().into_diagnostic()?;

    let api_config = ApiConfig::new(&cli.api_url, Duration::from_secs(cli.timeout_secs))
        .into_diagnostic()?;
    let api = ApiClient::new(&api_config, Arc::new(StaticToken::new(cli.token)))
        .into_diagnostic()?;
    let resources = ResourceClient::new(api.clone());
    let store = StoreConfig::select(cli.store_path, cli.db_path);

    match cli.command {
        Command::List {
            resource,
            page,
            limit,
            search,
        } => {
            let query = ListQuery {
                page,
                limit,
                search,
            };
            let page: Page<serde_json::Value> =
                resources.list(resource, &query).await.into_diagnostic()?;
            print_json(&page)
        }
        Command::Get { resource, id } => {
            let record: serde_json::Value = resources.get(resource, id).await.into_diagnostic()?;
            print_json(&record)
        }
        Command::Delete { resource, id } => {
            resources.delete(resource, id).await.into_diagnostic()?;
            tracing::info!(%resource, id, "Deleted");
            Ok(())
        }
        Command::Ask { message } => {
            let reply = AssistantClient::new(api)
                .ask(&message)
                .await
                .into_diagnostic()?;
            println!("{}", reply.reply);
            Ok(())
        }
        Command::Markers => {
            let markers = open_store(store).await?;
            print_json(&markers.all().await.into_diagnostic()?)
        }
        Command::Pay {
            appointment_id,
            appointment,
            email,
        } => {
            let appointment: Appointment = match (appointment, appointment_id) {
                (Some(path), _) => {
                    serde_json::from_slice(&read_input(&path)?).into_diagnostic()?
                }
                (None, Some(id)) => resources
                    .get(Resource::Appointments, id)
                    .await
                    .into_diagnostic()?,
                (None, None) => {
                    return Err(miette!("an appointment id or --appointment is required"));
                }
            };
            let (workflow, confirmed) = build_workflow(api, store).await?;
            let mut session = PaymentWorkflow::session_for(&appointment);

            let outcome = workflow
                .pay(&mut session, &appointment, &email)
                .await
                .into_diagnostic()?;
            let label = button_label(&appointment, &session);
            let report = match &outcome {
                PayOutcome::AlreadyPaid => SessionReport::new(&session, label, None),
                PayOutcome::Verified(result) => SessionReport::new(&session, label, Some(result)),
                PayOutcome::Redirected {
                    initiation,
                    verification,
                } => SessionReport::new(&session, label, verification.as_ref())
                    .with_initiation(initiation),
            };
            print_refreshed(&resources, report, &confirmed).await
        }
        Command::Verify {
            appointment_id,
            reference,
        } => {
            let (workflow, confirmed) = build_workflow(api, store).await?;
            let mut session = VerificationSession::new(AppointmentId(appointment_id));
            if let Some(reference) = reference {
                session = session.with_reference(reference);
            }

            let verified = workflow.verify(&mut session).await;
            let report =
                SessionReport::new(&session, session_label(&session), verified.as_ref().ok());
            print_refreshed(&resources, report, &confirmed).await?;
            verified.map(|_| ()).into_diagnostic()
        }
        Command::Resume { appointment_id } => {
            let (workflow, confirmed) = build_workflow(api, store).await?;
            let mut session = VerificationSession::new(AppointmentId(appointment_id));

            let resumed = workflow.resume(&mut session).await;
            if matches!(resumed, Ok(None)) {
                tracing::info!(appointment_id, "No pending payment to verify");
            }
            let result = resumed.as_ref().ok().and_then(Option::as_ref);
            let report = SessionReport::new(&session, session_label(&session), result);
            print_refreshed(&resources, report, &confirmed).await?;
            resumed.map(|_| ()).into_diagnostic()
        }
        Command::Appointments { patient_id } => {
            let appointments: Vec<Appointment> = resources
                .for_patient(Resource::Appointments, patient_id)
                .await
                .into_diagnostic()?;
            let (workflow, confirmed) = build_workflow(api, store).await?;

            // Every card resumes once; a failure stays on that card's session.
            let mut sessions = Vec::with_capacity(appointments.len());
            for appointment in &appointments {
                let mut session = PaymentWorkflow::session_for(appointment);
                let result = match workflow.resume(&mut session).await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::warn!(
                            appointment_id = %appointment.appointment_id,
                            error = %e,
                            "Verification on load failed"
                        );
                        None
                    }
                };
                sessions.push((session, result));
            }

            let refreshed = if has_confirmations(&confirmed) {
                match resources
                    .for_patient::<serde_json::Value>(Resource::Appointments, patient_id)
                    .await
                {
                    Ok(list) => Some(list),
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not refresh appointments");
                        None
                    }
                }
            } else {
                None
            };

            print_json(&PatientReport {
                patient_id,
                sessions: appointments
                    .iter()
                    .zip(&sessions)
                    .map(|(appointment, (session, result))| {
                        SessionReport::new(
                            session,
                            button_label(appointment, session),
                            result.as_ref(),
                        )
                    })
                    .collect(),
                appointments: refreshed,
            })
        }
    }
}

type Confirmed = Arc<Mutex<Vec<AppointmentId>>>;

async fn build_workflow(
    api: ApiClient,
    store: StoreConfig,
) -> Result<(PaymentWorkflow, Confirmed)> {
    let markers: SharedMarkerStore = Arc::from(open_store(store).await?);
    let confirmed: Confirmed = Arc::default();
    let sink = confirmed.clone();

    let workflow = PaymentWorkflow::new(
        Arc::new(HttpPaymentGateway::new(api)),
        markers,
        Arc::new(ConsoleRedirector::stderr()),
    )
    .with_observer(Arc::new(move |appointment_id: AppointmentId| {
        if let Ok(mut ids) = sink.lock() {
            ids.push(appointment_id);
        }
    }));
    Ok((workflow, confirmed))
}

async fn open_store(store: StoreConfig) -> Result<MarkerStoreBox> {
    match store {
        StoreConfig::JsonFile(path) => Ok(Box::new(
            JsonFileMarkerStore::open(path).await.into_diagnostic()?,
        )),
        #[cfg(feature = "storage-rocksdb")]
        StoreConfig::RocksDb { path, .. } => Ok(Box::new(
            carepay::infrastructure::rocksdb::RocksDBMarkerStore::open(path)
                .into_diagnostic()?,
        )),
        #[cfg(not(feature = "storage-rocksdb"))]
        StoreConfig::RocksDb { path, fallback } => {
            tracing::warn!(
                db_path = %path.display(),
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to the JSON marker file."
            );
            Ok(Box::new(
                JsonFileMarkerStore::open(fallback).await.into_diagnostic()?,
            ))
        }
    }
}

fn session_label(session: &VerificationSession) -> &'static str {
    if session.is_completed() {
        "Payment Completed"
    } else if session.attempts() > 0 {
        "Verify Payment"
    } else {
        "Make Payment"
    }
}

fn has_confirmations(confirmed: &Confirmed) -> bool {
    confirmed.lock().map(|ids| !ids.is_empty()).unwrap_or(false)
}

/// Prints `report`, attaching the refetched appointment once its payment is
/// confirmed.
async fn print_refreshed(
    resources: &ResourceClient,
    mut report: SessionReport<'_>,
    confirmed: &Confirmed,
) -> Result<()> {
    let was_confirmed = confirmed
        .lock()
        .map(|ids| ids.contains(&report.appointment_id))
        .unwrap_or(false);

    if was_confirmed {
        match resources
            .get::<serde_json::Value>(Resource::Appointments, report.appointment_id.0)
            .await
        {
            Ok(appointment) => report.appointment = Some(appointment),
            Err(e) => tracing::warn!(error = %e, "Could not refresh appointment"),
        }
    }
    print_json(&report)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).into_diagnostic()?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(|e| miette!("cannot read {}: {e}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    Ok(())
}
