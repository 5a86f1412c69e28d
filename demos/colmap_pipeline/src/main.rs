use argh::FromArgs;
use std::path::PathBuf;

use skysplat::pipeline::{
    brush::{default_export_path, resolve_training_source},
    run_command, stage_input_images, CancelToken, ColmapPipeline, PipelineConfig,
};

#[derive(FromArgs)]
/// Run COLMAP on a folder of photos and train Gaussian splats with Brush
struct Args {
    /// folder with .jpg/.jpeg/.png photos
    #[argh(option, short = 'i')]
    images: PathBuf,

    /// processing root receiving input/, images/ and sparse/0
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// pipeline configuration as JSON
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// write the effective configuration to this file and exit
    #[argh(option)]
    save_config: Option<PathBuf>,

    /// stop after COLMAP
    #[argh(switch)]
    skip_training: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = &args.save_config {
        config.to_json_file(path)?;
        println!("configuration written to {}", path.display());
        return Ok(());
    }

    // create a cancel token to stop the running stage
    let cancel = CancelToken::new();
    ctrlc::set_handler({
        let cancel = cancel.clone();
        move || {
            println!("Received Ctrl-C signal. Sending cancel signal !!");
            cancel.cancel();
        }
    })?;

    let count = stage_input_images(&args.images, &args.output)?;
    log::info!("{count} images staged");

    let pipeline = ColmapPipeline::new(config.colmap.clone(), config.multires.clone())
        .with_cancel_token(cancel.clone());
    let model_dir = pipeline.run(&args.output)?;
    println!("sparse model written to {}", model_dir.display());

    if args.skip_training {
        return Ok(());
    }

    let source = resolve_training_source(&args.output).unwrap_or(model_dir);
    let mut brush = config.brush.clone();
    if brush.export_path.is_none() {
        brush.export_path = Some(default_export_path(&source));
    }
    let cmd = brush.command(&source);
    println!("training: {cmd}");
    run_command(&cmd, "brush", &cancel)?;

    if let Some(export_path) = &brush.export_path {
        println!("splats exported to {}", export_path.display());
    }

    Ok(())
}
