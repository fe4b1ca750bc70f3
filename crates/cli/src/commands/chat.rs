use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use barista_agent::{GeminiClient, Orchestrator};
use barista_core::catalog::Menu;
use barista_core::config::AppConfig;
use barista_core::conversation::Message;
use barista_core::recommendations::{AprioriTable, PopularityTable, RecommendationEngine};

use crate::commands::CommandResult;

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let mut config = match AppConfig::load(super::load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let Some(api_key) = config.llm.api_key.take() else {
        return CommandResult::failure(
            "chat",
            "credentials",
            "no Gemini API key configured; set BARISTA_GEMINI_API_KEY or llm.api_key in barista.toml",
            3,
        );
    };

    let menu = match Menu::load(&config.data.products_path) {
        Ok(menu) => menu,
        Err(error) => return CommandResult::failure("chat", "data_load", error.to_string(), 4),
    };
    let apriori = match AprioriTable::load(&config.data.apriori_path) {
        Ok(table) => table,
        Err(error) => return CommandResult::failure("chat", "data_load", error.to_string(), 4),
    };
    let popularity = match PopularityTable::load(&config.data.popularity_path) {
        Ok(table) => table,
        Err(error) => return CommandResult::failure("chat", "data_load", error.to_string(), 4),
    };

    init_logging(&config);

    let client = Arc::new(GeminiClient::new(
        api_key,
        config.llm.completion_model.clone(),
        config.llm.embedding_model.clone(),
    ));
    let engine = Arc::new(RecommendationEngine::new(apriori, popularity));
    let orchestrator =
        Orchestrator::new(config.pipeline.clone(), Arc::new(menu), engine, client, None);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                5,
            );
        }
    };

    runtime.block_on(converse(&orchestrator));
    CommandResult::success("chat", "conversation ended")
}

async fn converse(orchestrator: &Orchestrator) {
    let stdin = io::stdin();
    let mut history: Vec<Message> = Vec::new();

    println!("Welcome to ShopEase! Ask about the menu or start an order. Type `exit` to leave.");
    loop {
        print!("you> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        history.push(Message::user(text));
        let reply = orchestrator.respond(&history).await;
        println!("shop> {}", reply.content);
        // Memory blocks ride along on the assistant message; the next turn
        // recovers order state from them.
        history.push(reply);
    }
    println!("Thanks for stopping by!");
}

fn init_logging(config: &AppConfig) {
    use barista_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(log_level);

    // try_init: a subscriber may already be installed when run in-process.
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
