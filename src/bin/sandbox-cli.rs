use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use sandbox_server::routing::Router;

#[derive(Parser)]
#[command(name = "sandbox-cli")]
#[command(about = "Client for the HTTP sandbox endpoints", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Namespace to call, e.g. "/playground/"
    #[arg(short, long, default_value = "/")]
    namespace: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the greeting
    Hello,
    /// Send a body (or query options) to the echo endpoint
    Echo {
        /// Request body to reflect
        #[arg(short, long)]
        body: Option<String>,
        /// Response status code to ask for
        #[arg(long)]
        code: Option<u16>,
        /// Response content instead of the body
        #[arg(long)]
        content: Option<String>,
        /// Extra response header, "Name: Value"
        #[arg(long)]
        header: Option<String>,
    },
    /// Show what the server saw of this request
    Meta,
    /// Upload files and list what the server received
    Upload {
        files: Vec<PathBuf>,
    },
    /// Call the Basic-protected hello
    BasicAuth {
        #[arg(long, default_value = "test")]
        user: String,
        #[arg(long, default_value = "12345")]
        password: String,
    },
    /// Print the route table for a mount prefix
    Routes {
        #[arg(long, default_value = "")]
        mount_prefix: String,
    },
}

fn endpoint_url(base: &str, namespace: &str, slug: &str) -> String {
    let namespace = namespace.trim_matches('/');
    if namespace.is_empty() {
        format!("{}/{slug}/", base.trim_end_matches('/'))
    } else {
        format!("{}/{namespace}/{slug}/", base.trim_end_matches('/'))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let url = |slug: &str| endpoint_url(&cli.url, &cli.namespace, slug);

    match cli.command {
        Commands::Hello => {
            let res = client.get(url("hello")).send().await?;
            print_response(res).await?;
        }
        Commands::Echo {
            body,
            code,
            content,
            header,
        } => {
            let mut query = Vec::new();
            if let Some(code) = code {
                query.push(("code", code.to_string()));
            }
            if let Some(content) = content {
                query.push(("content", content));
            }
            if let Some(header) = header {
                query.push(("header", header));
            }
            let res = client
                .post(url("echo"))
                .query(&query)
                .body(body.unwrap_or_default())
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Meta => {
            let res = client.get(url("dumpmeta")).send().await?;
            print_response(res).await?;
        }
        Commands::Upload { files } => {
            let mut form = Form::new();
            for path in files {
                let data = tokio::fs::read(&path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                form = form.part("file", Part::bytes(data).file_name(name));
            }
            let res = client.post(url("dumpupload")).multipart(form).send().await?;
            print_response(res).await?;
        }
        Commands::BasicAuth { user, password } => {
            let res = client
                .get(url("hello_with_basic_auth"))
                .basic_auth(user, Some(password))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Routes { mount_prefix } => {
            let router = Router::sandbox(&mount_prefix)?;
            for route in router.routes() {
                println!("{:<40} {}", route.pattern(), route.name());
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let is_json = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if !status.is_success() {
        eprintln!("Error: sandbox returned status {}", status);
        if let Some(challenge) = res.headers().get(reqwest::header::WWW_AUTHENTICATE) {
            eprintln!("Challenge: {}", challenge.to_str().unwrap_or("<binary>"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if is_json {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("{}", res.text().await?);
    }
    Ok(())
}
