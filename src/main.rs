mod cli;

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, TargetArgs};
use tfgate::{Options, Terraform, checks, layout, report};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let terraform = Terraform::cli();

    match cli.command {
        Command::Check(args) => {
            let options = base_options(&args)?;
            tracing::info!(dir = %options.dir().display(), "running checks");

            let outcomes = checks::run_all(Arc::new(terraform), &options).await;
            println!("{}", report::outcomes_table(&outcomes));

            let failed = outcomes.iter().filter(|o| !o.passed()).count();
            if failed > 0 {
                bail!("{} of {} checks failed", failed, outcomes.len());
            }
        }
        Command::Plan(args) => {
            let options = base_options(&args.target)?.with_var("app_name", args.app_name);
            let plan = terraform.init_and_plan_and_show(&options).await?;
            if args.json {
                println!("{}", plan.raw_json);
            } else {
                println!("{}", report::changes_table(&plan));
            }
        }
    }

    Ok(())
}

fn base_options(args: &TargetArgs) -> Result<Options> {
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => layout::terraform_dir()?,
    };

    Ok(Options::new(dir)
        .with_binary(args.binary.clone())
        .no_color(!args.color))
}
