use crate::gateway::{Backend, Gateway};
use crate::model::{default_enrichment, ApiConfig, EnrichmentField, Mode, TurnContent};
use crate::orchestrator::{
    ConversationOrchestrator, QueryConsoleOrchestrator, RecommendationOrchestrator, SubmitOutcome,
};
use crate::text_output;
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "tourgraph-cli",
    version,
    about = "TourGraph knowledge-graph client with optional TUI"
)]
pub struct Cli {
    /// Base URL of the TourGraph API
    #[arg(long, default_value = "http://127.0.0.1:5000/api")]
    pub base_url: String,

    /// Ask the assistant a question and exit (no TUI)
    #[arg(long)]
    pub ask: Option<String>,

    /// Translate text to a query, execute it, and exit (no TUI)
    #[arg(long)]
    pub translate: Option<String>,

    /// Execute a raw SPARQL query and exit (no TUI)
    #[arg(long)]
    pub query: Option<String>,

    /// Run --query through the enrichment endpoint
    #[arg(long)]
    pub enrich: bool,

    /// Enrichment fields for --enrich (comma-separated: image,description,website)
    #[arg(long, default_value = "image", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Request recommendations for a client URI and exit (no TUI)
    #[arg(long)]
    pub predict: Option<String>,

    /// Print the raw response body as JSON instead of formatted text
    #[arg(long)]
    pub json: bool,

    /// Per-request timeout
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,
}

/// One-shot actions, mutually exclusive on the command line.
#[derive(Debug, Clone)]
enum Action {
    Ask(String),
    Translate(String),
    Query(String),
    Predict(String),
}

pub async fn run(args: Cli) -> Result<()> {
    let action = one_shot_action(&args)?;

    match action {
        Some(action) => {
            init_tracing();
            run_one_shot(&args, action).await
        }
        None => {
            #[cfg(feature = "tui")]
            {
                crate::tui::run(args).await
            }
            #[cfg(not(feature = "tui"))]
            {
                Err(anyhow::anyhow!(
                    "built without the TUI; use --ask, --translate, --query or --predict"
                ))
            }
        }
    }
}

/// Build the API configuration from CLI arguments.
pub fn build_config(args: &Cli) -> ApiConfig {
    ApiConfig {
        base_url: args.base_url.clone(),
        timeout: Duration::from(args.timeout),
        user_agent: format!("tourgraph-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Parse and de-duplicate the `--fields` selection.
pub fn parse_fields(raw: &[String]) -> Result<Vec<EnrichmentField>> {
    let mut fields = Vec::new();
    for item in raw {
        let field = EnrichmentField::parse(item).with_context(|| {
            format!("unknown enrichment field: {item} (expected image, description or website)")
        })?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    if fields.is_empty() {
        return Ok(default_enrichment());
    }
    Ok(fields)
}

fn one_shot_action(args: &Cli) -> Result<Option<Action>> {
    let mut actions = Vec::new();
    if let Some(q) = &args.ask {
        actions.push(Action::Ask(q.clone()));
    }
    if let Some(t) = &args.translate {
        actions.push(Action::Translate(t.clone()));
    }
    if let Some(q) = &args.query {
        actions.push(Action::Query(q.clone()));
    }
    if let Some(c) = &args.predict {
        actions.push(Action::Predict(c.clone()));
    }

    if actions.len() > 1 {
        return Err(anyhow::anyhow!(
            "--ask, --translate, --query and --predict are mutually exclusive"
        ));
    }
    if args.enrich && !matches!(actions.first(), Some(Action::Query(_))) {
        return Err(anyhow::anyhow!("--enrich requires --query"));
    }

    Ok(actions.pop())
}

/// Stderr logging for the non-interactive modes, controlled via RUST_LOG.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_one_shot(args: &Cli, action: Action) -> Result<()> {
    let cfg = build_config(args);
    let gateway = Arc::new(Gateway::new(&cfg)?);

    if args.json {
        let body = match &action {
            Action::Ask(question) => gateway.ask(question).await?,
            Action::Query(query) if args.enrich => {
                gateway.enrich(query, &parse_fields(&args.fields)?).await?
            }
            Action::Query(query) => gateway.execute(query).await?,
            Action::Predict(client_uri) => gateway.predict(client_uri).await?,
            Action::Translate(text) => {
                // For translation the interesting body is the execution
                // result of the generated query.
                let translated = gateway.translate(text).await?;
                let query = crate::orchestrator::extract_query(&translated)
                    .map(|q| crate::orchestrator::strip_code_fences(&q))
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                gateway.execute(&query).await?
            }
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let lines = match action {
        Action::Ask(question) => {
            let mut chat = ConversationOrchestrator::new(gateway.clone());
            match chat.submit(&question).await {
                SubmitOutcome::Answered => {}
                _ => return Err(last_failure(&chat)),
            }
            match chat.history().last().map(|t| &t.content) {
                Some(TurnContent::Answer(answer)) => {
                    answer.lines().map(str::to_string).collect()
                }
                _ => return Err(anyhow::anyhow!("no answer recorded")),
            }
        }
        Action::Translate(text) => {
            let mut chat = ConversationOrchestrator::new(gateway.clone());
            chat.set_mode(Mode::StructuredQuery);
            match chat.submit(&text).await {
                SubmitOutcome::Answered => {}
                _ => return Err(last_failure(&chat)),
            }
            match chat.history().last().map(|t| &t.content) {
                Some(TurnContent::QueryOutcome { query, results }) => {
                    let mut lines = vec!["Generated query:".to_string()];
                    lines.extend(query.lines().map(|l| format!("  {l}")));
                    lines.push(String::new());
                    lines.extend(text_output::document_lines(results));
                    lines
                }
                _ => return Err(anyhow::anyhow!("no query outcome recorded")),
            }
        }
        Action::Query(query) => {
            let console = QueryConsoleOrchestrator::new(gateway.clone());
            let selection = parse_fields(&args.fields)?;
            let out = console.run(&query, args.enrich, &selection).await?;
            text_output::console_lines(&out)
        }
        Action::Predict(client_uri) => {
            let rec = RecommendationOrchestrator::new(gateway.clone());
            let outcome = rec.predict(&client_uri).await?;
            text_output::prediction_lines(&outcome)
        }
    };

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Turn the failure turn recorded by the chat orchestrator into an error.
fn last_failure(chat: &ConversationOrchestrator) -> anyhow::Error {
    match chat.history().last().map(|t| &t.content) {
        Some(TurnContent::Plain(message)) => anyhow::anyhow!("{message}"),
        _ => anyhow::anyhow!("request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn action_flags_are_mutually_exclusive() {
        let args = Cli::parse_from([
            "tourgraph-cli",
            "--ask",
            "hi",
            "--query",
            "SELECT ?x",
        ]);
        assert!(one_shot_action(&args).is_err());
    }

    #[test]
    fn enrich_requires_query() {
        let args = Cli::parse_from(["tourgraph-cli", "--enrich", "--ask", "hi"]);
        assert!(one_shot_action(&args).is_err());

        let args = Cli::parse_from(["tourgraph-cli", "--enrich", "--query", "SELECT ?x"]);
        assert!(matches!(
            one_shot_action(&args).unwrap(),
            Some(Action::Query(_))
        ));
    }

    #[test]
    fn no_action_flags_selects_interactive_mode() {
        let args = Cli::parse_from(["tourgraph-cli"]);
        assert!(one_shot_action(&args).unwrap().is_none());
    }

    #[test]
    fn fields_parse_and_deduplicate() {
        let fields = parse_fields(&["image".into(), "website".into(), "image".into()]).unwrap();
        assert_eq!(
            fields,
            vec![EnrichmentField::Image, EnrichmentField::Website]
        );
        assert!(parse_fields(&["thumbnail".into()]).is_err());
        assert_eq!(parse_fields(&[]).unwrap(), default_enrichment());
    }

    #[test]
    fn default_base_url_points_at_local_api() {
        let args = Cli::parse_from(["tourgraph-cli"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://127.0.0.1:5000/api");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }
}
