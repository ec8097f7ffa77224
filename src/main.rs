use std::{process, sync::Arc};

use rxlens::{
    application::{
        auth::AuthService,
        error::AppError,
        export::ExportService,
        lookup::LookupService,
        quotes::RandomQuotes,
        repos::UsersRepo,
        sources::{ClassificationSource, LabelSource},
        speech::Speaker,
    },
    cache::{FDA_KIND, RXNAV_KIND, RecordStore},
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState, session::session_key},
        sources::{OpenFdaClient, RxClassClient, build_client},
        speech::CommandSpeaker,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let (cli_args, settings) = config::load_with_cli()?;
    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Lookup(args) => run_lookup(settings, args).await,
        config::Command::Export(args) => run_export(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    if settings.session.using_fallback_key {
        warn!(
            target = "rxlens::config",
            "no session secret configured; using the built-in development key"
        );
    }

    let repositories = init_repositories(&settings).await?;
    let lookup = build_lookup_service(&settings)?;

    let users: Arc<dyn UsersRepo> = repositories.clone();
    let speaker: Arc<dyn Speaker> = Arc::new(CommandSpeaker::from_settings(&settings.speech));

    let state = HttpState {
        export: ExportService::new(lookup.clone()),
        lookup,
        auth: AuthService::new(users),
        speaker,
        db: repositories,
        session_key: session_key(&settings.session.secret_key),
    };

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "rxlens::serve",
        addr = %settings.server.addr,
        cache_dir = %settings.cache.directory.display(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_lookup(settings: config::Settings, args: config::LookupArgs) -> Result<(), AppError> {
    let lookup = build_lookup_service(&settings)?;
    let combined = lookup.lookup(&args.drug).await?;

    let encoded = if args.pretty {
        serde_json::to_string_pretty(&combined)
    } else {
        serde_json::to_string(&combined)
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode result: {err}")))?;

    println!("{encoded}");
    Ok(())
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let export = ExportService::new(build_lookup_service(&settings)?);
    let spreadsheet = export.export(&args.drug).await?;

    tokio::fs::write(&args.file, &spreadsheet.bytes)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "rxlens::export",
        path = %args.file.display(),
        bytes = spreadsheet.bytes.len(),
        "spreadsheet written"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(
        &settings.database.url,
        settings.database.max_connections.get(),
    )
    .await
    .map_err(|err| InfraError::database(err.to_string()))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

fn build_lookup_service(settings: &config::Settings) -> Result<LookupService, AppError> {
    let client = build_client(&settings.upstream)?;
    let classifications: Arc<dyn ClassificationSource> = Arc::new(RxClassClient::new(
        client.clone(),
        settings.upstream.rxclass_base.clone(),
    ));
    let labels: Arc<dyn LabelSource> = Arc::new(OpenFdaClient::new(
        client,
        settings.upstream.openfda_base.clone(),
    ));

    let directory = &settings.cache.directory;
    let classification_store =
        RecordStore::open(directory, RXNAV_KIND).map_err(InfraError::from)?;
    let label_store = RecordStore::open(directory, FDA_KIND).map_err(InfraError::from)?;

    Ok(LookupService::new(
        classifications,
        labels,
        Arc::new(classification_store),
        Arc::new(label_store),
        Arc::new(RandomQuotes),
    ))
}
