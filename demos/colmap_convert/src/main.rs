use argh::FromArgs;
use std::path::PathBuf;

use skysplat::colmap::{self, ModelFormat};

#[derive(FromArgs)]
/// Convert a COLMAP sparse model between the text and binary layouts
struct Args {
    /// directory holding cameras, images and points3D
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// output directory
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// write .txt files instead of .bin
    #[argh(switch)]
    text: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let source_format = colmap::detect_format(&args.input)?;
    let model = colmap::read_model(&args.input)?;

    let target_format = if args.text {
        ModelFormat::Text
    } else {
        ModelFormat::Binary
    };
    colmap::write_model(&model, &args.output, target_format)?;

    log::info!(
        "converted {:?} -> {:?}: {} cameras, {} images, {} points",
        source_format,
        target_format,
        model.cameras.len(),
        model.images.len(),
        model.points3d.len()
    );

    Ok(())
}
