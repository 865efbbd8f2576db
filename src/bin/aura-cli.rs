use clap::{Parser, Subcommand};
use serde::Serialize;

use aura_backend::client::PlanClient;
use aura_backend::planner::{LearningRequest, SavePlanRequest};

#[derive(Parser)]
#[command(name = "aura-cli")]
#[command(about = "Command-line client for the Aura learning-plan backend", long_about = None)]
struct Cli {
    #[arg(short, long, env = "AURA_URL", default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is up
    Status,
    /// Generate a learning plan
    Generate {
        #[arg(short, long)]
        topic: String,
        #[arg(long, default_value_t = 5)]
        hours: u32,
        #[arg(short, long, default_value = "mixed")]
        format: String,
        #[arg(long)]
        user: Option<String>,
        /// Save the plan for --user after generating it
        #[arg(long, requires = "user")]
        save: bool,
    },
    /// List saved plans for a user
    List {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = PlanClient::new(&cli.url);

    match cli.command {
        Commands::Status => {
            print_json(&client.status().await?)?;
            print_json(&client.health().await?)?;
        }
        Commands::Generate {
            topic,
            hours,
            format,
            user,
            save,
        } => {
            let plan = client
                .generate_plan(&LearningRequest {
                    topic,
                    hours_per_week: hours,
                    preferred_format: format,
                    user_id: user.clone(),
                })
                .await?;
            print_json(&plan)?;

            if let (true, Some(user_id)) = (save, user) {
                let modules = plan
                    .modules
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<Vec<_>, _>>()?;
                let saved = client
                    .save_plan(&SavePlanRequest {
                        user_id,
                        plan_title: plan.plan_title.clone(),
                        modules,
                    })
                    .await?;
                print_json(&saved)?;
            }
        }
        Commands::List { user } => {
            print_json(&client.list_plans(&user).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
