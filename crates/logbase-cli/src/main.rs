use clap::{Parser, Subcommand};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use url::Url;

#[derive(Parser)]
#[command(name = "logbase")]
#[command(about = "Admin CLI for the Logbase content service")]
struct Cli {
    /// Base URL for the Logbase service
    #[arg(long, default_value = "http://localhost:3000")]
    service_url: Url,

    /// Admin bearer token
    #[arg(long, env = "LOGBASE_ADMIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an RSS collection now
    Collect {
        /// Collect this day (YYYY-MM-DD) instead of yesterday
        #[arg(long)]
        date: Option<String>,
    },
    /// Manage filter keywords
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    /// Compose and send newsletters
    Newsletter {
        #[command(subcommand)]
        command: NewsletterCommands,
    },
}

#[derive(Subcommand)]
enum KeywordCommands {
    List,
    Add { keyword: String },
    Remove { keyword: String },
    Rename { from: String, to: String },
}

#[derive(Subcommand)]
enum NewsletterCommands {
    /// List composed newsletters
    List,
    /// Compose a newsletter
    Create {
        #[arg(short, long)]
        title: String,
        /// HTML body of the issue
        #[arg(short, long)]
        content: String,
        /// Send date (YYYY-MM-DD); items scheduled for it are included
        #[arg(short, long)]
        sent_date: String,
        /// Featured link shown as a preview card
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Send a composed newsletter to active subscribers
    Send {
        filename: String,
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateNewsletter {
    title: String,
    content: String,
    sent_date: String,
    url: Option<String>,
}

#[derive(Serialize)]
struct SendNewsletter {
    filename: String,
    subject: Option<String>,
}

struct ServiceClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl ServiceClient {
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Box<dyn Error>> {
        let endpoint = self.base.join(path)?;
        let request = self.client.request(method, endpoint);
        Ok(match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<(), Box<dyn Error>> {
        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        } else {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("no error message");
            Err(format!("request failed ({status}): {message}").into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let service = ServiceClient {
        client: Client::new(),
        base: cli.service_url,
        token: cli.token,
    };

    let request = match cli.command {
        Commands::Collect { date } => {
            let request = service.request(Method::POST, "/api/rss-collect")?;
            match date {
                Some(date) => request.query(&[("date", date)]),
                None => request,
            }
        }
        Commands::Keywords { command } => match command {
            KeywordCommands::List => service.request(Method::GET, "/api/keywords")?,
            KeywordCommands::Add { keyword } => service
                .request(Method::POST, "/api/keywords")?
                .json(&serde_json::json!({ "keyword": keyword })),
            KeywordCommands::Remove { keyword } => service
                .request(Method::DELETE, "/api/keywords")?
                .json(&serde_json::json!({ "keyword": keyword })),
            KeywordCommands::Rename { from, to } => service
                .request(Method::PUT, "/api/keywords")?
                .json(&serde_json::json!({ "from": from, "to": to })),
        },
        Commands::Newsletter { command } => match command {
            NewsletterCommands::List => service.request(Method::GET, "/api/newsletters")?,
            NewsletterCommands::Create {
                title,
                content,
                sent_date,
                url,
            } => service
                .request(Method::POST, "/api/newsletter-create")?
                .json(&CreateNewsletter {
                    title,
                    content,
                    sent_date,
                    url,
                }),
            NewsletterCommands::Send { filename, subject } => service
                .request(Method::POST, "/api/newsletter-send")?
                .json(&SendNewsletter { filename, subject }),
        },
    };

    service.send(request).await
}
