mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use clipforge::{config, pipeline};
use clipforge_av::{actions, check_tools, ScratchDir};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Generate { prompt, scratch } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;

            // The environment is consulted here once; stages only ever see
            // the explicit config.
            if config.generation.api_key.is_none() {
                config.generation.api_key = std::env::var("DASHSCOPE_API_KEY").ok();
            }
            if let Some(scratch) = scratch {
                config.pipeline.scratch_root = scratch;
            }

            let store = ScratchDir::create(&config.pipeline.scratch_root)?;
            let mut run = pipeline::PipelineRun::new(store);
            if let Some(timeout) = config.pipeline.stage_timeout() {
                run = run.with_stage_timeout(timeout);
            }

            let steps = pipeline::generation_steps(&config, &prompt)?;
            let final_path = run.execute(&steps).await?;
            println!("{}", final_path.display());
        }

        Commands::Trim {
            input,
            seconds,
            output,
        } => {
            if input.is_dir() {
                let out_dir = output.unwrap_or_else(|| input.join("trimmed_videos"));
                let written = actions::trim_all(&input, &out_dir, seconds)?;
                for path in written {
                    println!("{}", path.display());
                }
            } else {
                let output = output.unwrap_or_else(|| {
                    let name = input
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "out.mp4".to_string());
                    input.with_file_name(format!("trimmed_{}", name))
                });
                actions::trim_trailing(&input, &output, seconds)?;
                println!("{}", output.display());
            }
        }

        Commands::LastFrame { video, output } => {
            let written = actions::extract_last_frame(&video, output.as_deref())?;
            println!("{}", written.display());
        }

        Commands::Concat {
            inputs,
            ext,
            output,
        } => {
            match inputs.as_slice() {
                [dir] if dir.is_dir() => actions::concat_directory(dir, &ext, &output)?,
                _ => actions::concat_files(&inputs, &output)?,
            }
            println!("{}", output.display());
        }

        Commands::CheckTools => {
            for info in check_tools() {
                if info.available {
                    println!(
                        "{}: {} ({})",
                        info.name,
                        info.version.as_deref().unwrap_or("unknown version"),
                        info.path
                            .as_deref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default()
                    );
                } else {
                    println!("{}: NOT FOUND", info.name);
                }
            }
        }
    }

    Ok(())
}
