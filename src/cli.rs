//! Command-line front end
//!
//! Wires a [`SearchSession`] and a file-backed [`QueryStore`] to clap
//! subcommands. The session plays the role the browser form plays in the web
//! front end.

use crate::config::Config;
use crate::query::{validate_query, Connector, DateFilter};
use crate::session::SearchSession;
use crate::store::{
    codec::format_timestamp, DeleteOutcome, FileBlobStore, QueryStore, SaveOutcome, SaveRequest,
};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

const PREVIEW_CHARS: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "pubmed-query")]
#[command(about = "Build, validate and save PubMed boolean queries")]
pub struct Cli {
    /// Directory holding the saved-query store (overrides PUBMED_QUERY_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the display summary and the search term for some criteria
    Render(CriteriaArgs),

    /// Check query text for dangling or doubled AND/OR operators
    Validate {
        text: String,
    },

    /// Save criteria under a name
    Save {
        name: String,
        #[command(flatten)]
        criteria: CriteriaArgs,
        /// Overwrite an existing query without asking
        #[arg(long, short)]
        force: bool,
    },

    /// List saved queries, newest first
    List,

    /// Load a saved query and print its search term
    Load {
        name: String,
    },

    /// Delete a saved query
    Delete {
        name: String,
    },

    /// Export the saved queries as a BOM-prefixed CSV file
    Export {
        path: PathBuf,
    },

    /// Show how many queries are saved
    Status,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CriteriaArgs {
    /// Keyword, optionally prefixed with the connector joining it to the previous one (`OR:tumor`)
    #[arg(long = "keyword", short = 'k')]
    pub keywords: Vec<KeywordArg>,

    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest publication date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Query text typed by hand; takes precedence over --keyword when saving
    #[arg(long)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordArg {
    pub connector: Connector,
    pub term: String,
}

impl FromStr for KeywordArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (connector, term) = match s.split_once(':') {
            Some((prefix, rest)) => match Connector::from_token(prefix.trim()) {
                Some(connector) => (connector, rest),
                None => (Connector::And, s),
            },
            None => (Connector::And, s),
        };

        let term = term.trim();
        if term.is_empty() {
            return Err("keyword must not be empty".to_string());
        }
        Ok(Self {
            connector,
            term: term.to_string(),
        })
    }
}

impl CriteriaArgs {
    pub fn to_session(&self, wrap: usize) -> SearchSession {
        let mut session = SearchSession::new().with_wrap(wrap);
        for keyword in &self.keywords {
            session.push_keyword(keyword.connector, keyword.term.clone());
        }
        if self.from.is_some() || self.to.is_some() {
            let start = self.from.map(|d| d.to_string());
            let end = self.to.map(|d| d.to_string());
            session.set_date_filter(DateFilter::range(start.as_deref(), end.as_deref()));
        }
        if let Some(text) = &self.text {
            session.edit_text(text.clone());
        }
        session
    }
}

pub fn run(cli: Cli, config: &Config) -> anyhow::Result<()> {
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.store.data_dir.clone());
    let mut store = QueryStore::new(FileBlobStore::with_path(data_dir), config.store.key.clone());
    let wrap = config.display.wrap_tokens;

    match cli.command {
        Commands::Render(criteria) => {
            let session = criteria.to_session(wrap);
            println!("{}", session.effective_text());
            match session.search_term() {
                Ok(term) => println!("\nterm: {}", term),
                Err(e) => println!("\n{}", e),
            }
        }

        Commands::Validate { text } => {
            validate_query(&text)?;
            println!("Query is valid");
        }

        Commands::Save {
            name,
            criteria,
            force,
        } => {
            store.initialize()?;
            let session = criteria.to_session(wrap);
            let request = SaveRequest::from_provider(name, &session);
            let outcome = store.save(&request, Utc::now(), |existing| {
                force || confirm(&format!("Query '{}' already exists. Overwrite?", existing))
            })?;
            match outcome {
                SaveOutcome::Created => println!("Saved query '{}'", request.name.trim()),
                SaveOutcome::Replaced => println!("Replaced query '{}'", request.name.trim()),
                SaveOutcome::Cancelled => println!("Save cancelled"),
            }
        }

        Commands::List => {
            let report = store.list_all()?;
            for diagnostic in &report.diagnostics {
                warn!("{}", diagnostic);
            }
            if report.queries.is_empty() {
                println!("No saved queries. Save one first.");
            }
            for query in &report.queries {
                println!("{}", query.name);
                println!("    {}", preview(&query.rendered_text));
                println!(
                    "    created {} | last used {}",
                    format_timestamp(&query.created_at),
                    format_timestamp(&query.last_used_at)
                );
            }
        }

        Commands::Load { name } => {
            let Some(query) = store.load(&name, Utc::now())? else {
                anyhow::bail!("No saved query named '{}'", name);
            };
            let mut session = SearchSession::new().with_wrap(wrap);
            session.apply(&query);
            println!("{}", session.effective_text());
            match session.search_term() {
                Ok(term) => println!("\nterm: {}", term),
                Err(e) => println!("\n{}", e),
            }
        }

        Commands::Delete { name } => match store.delete(&name)? {
            DeleteOutcome::Deleted => println!("Deleted query '{}'", name),
            DeleteOutcome::NotFound => println!("No saved query named '{}'", name),
        },

        Commands::Export { path } => {
            store.export_to_file(&path)?;
            println!("Exported to {}", path.display());
        }

        Commands::Status => println!("{}", store.status()?),
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
