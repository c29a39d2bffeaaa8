use anyhow::Context;
use redicraft::config::DEFAULT_CONFIG_FILE;
use redicraft::web::AppState;
use redicraft::{
    server, web, ClusterCoordinator, CommandContext, Config, Dispatcher, PersistenceManager,
    ReplicationCoordinator, ReplicationRole, StorageEngine,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => {
            info!("Loaded configuration from {}", config_path);
            config
        }
        Err(e) => {
            warn!("{}, using defaults", e);
            Config::default()
        }
    };

    // One worker per core, at least four
    let workers = num_cpus::get().max(4);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("failed to build the async runtime")?;

    info!("RediCraft starting with {} worker threads", workers);
    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let engine = Arc::new(StorageEngine::new());
    let mut context = CommandContext::with_engine(engine.clone());

    // Persistence: load what the last run saved
    let persistence = if config.persistence_enabled {
        let manager = Arc::new(PersistenceManager::new(engine.clone(), &config.persistence_file));
        if Path::new(&config.persistence_file).exists() {
            if let Err(e) = manager.load_from_file(&config.persistence_file) {
                error!("Failed to load snapshot: {}", e);
            }
        }
        Some(manager)
    } else {
        None
    };

    // Clustering
    let cluster = if config.clustering_enabled {
        let cluster = Arc::new(ClusterCoordinator::new());
        for node in &config.cluster_nodes {
            cluster.add_node(&node.host, node.port, node.is_master);
        }
        if let Err(e) = cluster.start_cluster(&config.cluster_addr()).await {
            error!("Failed to start cluster manager: {}", e);
        }
        if let Err(e) = cluster.start_node_discovery() {
            error!("Failed to start node discovery: {}", e);
        }
        context.set_cluster(cluster.clone());
        Some(cluster)
    } else {
        None
    };

    // Replication
    let replication = if config.replication_enabled {
        let replication = Arc::new(ReplicationCoordinator::new(
            engine.clone(),
            config.replication_role,
        ));
        let started = match config.replication_role {
            ReplicationRole::Master => replication
                .start_master(&config.replication_addr())
                .await
                .map(|_| ()),
            ReplicationRole::Slave => replication.start_slave(&config.master_addr()),
        };
        if let Err(e) = started {
            error!("Failed to start replication: {}", e);
        }
        context.set_replication(replication.clone());
        Some(replication)
    } else {
        None
    };

    if let Some(persistence) = &persistence {
        persistence
            .start_auto_persistence(config.persistence_interval())
            .context("failed to start auto persistence")?;
    }

    let dispatcher = Arc::new(Dispatcher::with_context(context));

    // Status surface
    let (web_stop, web_handle) = if config.web_enabled {
        let mut state = AppState::new(dispatcher.clone());
        state.cluster = cluster.clone();
        state.replication = replication.clone();
        state.persistence = persistence.clone();

        let web_addr = config.web_addr();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&web_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind web interface on {}: {}", web_addr, e);
                    return;
                }
            };
            let shutdown = async move {
                let _ = rx.await;
            };
            if let Err(e) = web::serve(listener, state, shutdown).await {
                error!("Web server error: {}", e);
            }
        });
        (Some(tx), Some(handle))
    } else {
        (None, None)
    };

    // Client listener: a bind failure is fatal
    let listener = server::bind(&config.client_addr())
        .await
        .context("cannot start the client listener")?;

    server::serve(listener, dispatcher, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await;

    info!("Shutting down");

    // Stop in reverse start order
    if let Some(tx) = web_stop {
        let _ = tx.send(());
    }
    if let Some(handle) = web_handle {
        let _ = handle.await;
    }

    if let Some(persistence) = &persistence {
        persistence.stop_auto_persistence().await;
    }

    if let Some(replication) = &replication {
        replication.stop_master().await;
        replication.stop_slave().await;
    }

    if let Some(cluster) = &cluster {
        cluster.stop_node_discovery().await;
        cluster.stop_cluster().await;
    }

    if let Some(persistence) = &persistence {
        match persistence.save_async().await {
            Ok(keys) => info!("Final snapshot saved ({} keys)", keys),
            Err(e) => error!("Final snapshot failed: {}", e),
        }
    }

    info!("RediCraft stopped");
    Ok(())
}
