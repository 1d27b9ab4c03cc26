use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use estimate_audit::audit::{
    audit_router, dataset, AuditEngine, AuditPolicy, AuditVerdict, Claim, MemoryReferenceStore,
    Severity,
};
use estimate_audit::config::AppConfig;
use estimate_audit::error::AppError;
use estimate_audit::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Estimate Audit Service",
    about = "Audit construction cost-estimate line items against official reference price books",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run audits from the command line
    Audit {
        #[command(subcommand)]
        command: AuditCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
    /// Reference price book JSON (overrides APP_REFERENCE_DATA)
    #[arg(long)]
    reference_data: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Audit a single claim file against a reference price book
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Reference price book JSON
    #[arg(long)]
    reference_data: PathBuf,
    /// Claim record JSON
    #[arg(long)]
    claim: PathBuf,
    /// Include the full calculation breakdown in the output
    #[arg(long)]
    breakdown: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Audit {
            command: AuditCommand::Run(args),
        } => run_audit(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let dataset_path = args
        .reference_data
        .take()
        .or_else(|| config.reference_data.clone())
        .ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no reference data configured; set APP_REFERENCE_DATA or pass --reference-data",
            ))
        })?;
    let store: MemoryReferenceStore = dataset::from_path(&dataset_path)?;
    info!(
        path = %dataset_path.display(),
        tables = store.table_count(),
        "reference price book loaded"
    );

    let engine = Arc::new(AuditEngine::new(Arc::new(store), AuditPolicy::default()));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(audit_router(engine))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "estimate audit service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_audit(args: RunArgs) -> Result<(), AppError> {
    let RunArgs {
        reference_data,
        claim,
        breakdown,
    } = args;

    let store = dataset::from_path(reference_data)?;
    let claim: Claim = {
        let file = File::open(claim)?;
        serde_json::from_reader(BufReader::new(file)).map_err(AppError::InvalidClaim)?
    };

    let engine = AuditEngine::new(Arc::new(store), AuditPolicy::default());
    let verdict = engine.audit(&claim)?;

    render_verdict(&claim, &verdict, breakdown);
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

fn render_verdict(claim: &Claim, verdict: &AuditVerdict, include_breakdown: bool) {
    println!("Estimate audit report ({})", Local::now().format("%Y-%m-%d"));
    println!(
        "Claim: table {} / quantity {:.2} / claimed cost {:.2}",
        claim.table_code, claim.quantity, claim.claimed_cost
    );

    let outcome = if verdict.is_approved {
        "APPROVED"
    } else {
        "REJECTED"
    };
    println!("\nVerdict: {outcome}");
    println!("Calculated total: {:.2}", verdict.calculated_total);
    println!("Reason: {}", verdict.reason);

    if verdict.discrepancies.is_empty() {
        println!("\nDiscrepancies: none");
    } else {
        println!("\nDiscrepancies");
        for discrepancy in &verdict.discrepancies {
            let marker = match discrepancy.severity {
                Severity::Critical => "!",
                Severity::Warning => "~",
            };
            println!(
                "- [{marker}] {}: {}",
                discrepancy.kind.label(),
                discrepancy.message
            );
        }
    }

    if include_breakdown {
        let breakdown = &verdict.calculation_breakdown;
        println!("\nCalculation breakdown");
        println!("- base cost: {:.2}", breakdown.base_cost);
        for coefficient in &breakdown.coefficients_applied {
            println!(
                "- coefficient {} = {:.2} ({})",
                coefficient.id, coefficient.value, coefficient.rationale
            );
        }
        println!("- final cost: {:.2}", breakdown.final_cost);
        println!("- formula: {}", breakdown.formula_text);
    }
}
