use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        admin::{AdminService, CreateGroupCommand, CreateUserCommand},
        error::AppError,
        feed::FeedService,
        posts::PostService,
        repos::{CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, UsersRepo},
        subscriptions::SubscriptionService,
    },
    cache::{CacheConfig, CacheTrigger, FeedCache},
    config,
    infra::{
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Users(args) => match args.command {
            config::UsersCommand::Create(create) => run_create_user(settings, create).await,
        },
        config::Command::Groups(args) => match args.command {
            config::GroupsCommand::Create(create) => run_create_group(settings, create).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings);
    serve_http(&settings, state).await
}

async fn run_create_user(
    settings: config::Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let admin = build_admin_service(init_repositories(&settings).await?);
    let user = admin
        .create_user(CreateUserCommand {
            username: args.username,
            first_name: args.first_name,
            last_name: args.last_name,
        })
        .await?;

    info!(
        target = "yatube::cli",
        user_id = %user.id,
        username = %user.username,
        "User created"
    );
    print_record(&user)
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let admin = build_admin_service(init_repositories(&settings).await?);
    let group = admin
        .create_group(CreateGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await?;

    info!(
        target = "yatube::cli",
        group_id = %group.id,
        slug = %group.slug,
        "Group created"
    );
    print_record(&group)
}

/// Created records go to stdout as JSON so scripts can pick up the new id.
fn print_record<T: serde::Serialize>(record: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|err| AppError::unexpected(format!("failed to encode record: {err}")))?;
    println!("{json}");
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
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

fn build_admin_service(repositories: Arc<SqliteRepositories>) -> AdminService {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories;
    AdminService::new(users_repo, groups_repo)
}

fn build_http_state(
    repositories: Arc<SqliteRepositories>,
    settings: &config::Settings,
) -> HttpState {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();

    let cache = Arc::new(FeedCache::new(&CacheConfig::from(&settings.cache)));
    let trigger = CacheTrigger::new(cache.clone());

    let feed = FeedService::new(
        posts_repo.clone(),
        users_repo.clone(),
        groups_repo.clone(),
        follows_repo.clone(),
        cache,
        settings.feed.page_size.get(),
    );
    let posts = PostService::new(
        posts_repo,
        posts_write_repo,
        groups_repo,
        comments_repo,
        follows_repo.clone(),
        trigger.clone(),
    );
    let subscriptions = SubscriptionService::new(follows_repo, users_repo.clone(), trigger);

    HttpState {
        feed: Arc::new(feed),
        posts: Arc::new(posts),
        subscriptions: Arc::new(subscriptions),
        users: users_repo,
        db: repositories,
        auth: Arc::new(settings.auth.clone()),
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let addr = settings.server.addr;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::from(InfraError::Bind { addr, source }))?;

    info!(target = "yatube::http", addr = %addr, "Listening");

    let shutdown = Arc::new(Notify::new());
    let signal = {
        let shutdown = shutdown.clone();
        async move {
            wait_for_shutdown_signal().await;
            shutdown.notify_one();
        }
    };
    let drain_deadline = drain_deadline(shutdown, settings.server.graceful_shutdown);

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(signal)
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!(target = "yatube::http", "Server stopped");
        }
        () = drain_deadline => {
            warn!(
                target = "yatube::http",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "In-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    Ok(())
}

/// Resolves once shutdown was requested and the grace period has elapsed.
async fn drain_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "yatube::http", error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "yatube::http", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!(target = "yatube::http", "Shutdown requested");
}
