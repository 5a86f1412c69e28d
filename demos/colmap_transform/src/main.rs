use argh::FromArgs;
use glam::{DQuat, DVec3, EulerRot};
use std::path::PathBuf;

use skysplat::{
    colmap::{self, ModelFormat},
    geometry::similarity::Similarity3,
    scene::{export_to_dir, ExportOptions, SceneBinding},
};

#[derive(FromArgs)]
/// Move, rotate and scale a COLMAP model as a whole and write a consistent copy
struct Args {
    /// directory holding the source model
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// output directory
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// uniform scale factor
    #[argh(option, default = "1.0")]
    scale: f64,

    /// rotation about x in degrees
    #[argh(option, default = "0.0")]
    rx: f64,

    /// rotation about y in degrees
    #[argh(option, default = "0.0")]
    ry: f64,

    /// rotation about z in degrees
    #[argh(option, default = "0.0")]
    rz: f64,

    /// translation along x
    #[argh(option, default = "0.0")]
    tx: f64,

    /// translation along y
    #[argh(option, default = "0.0")]
    ty: f64,

    /// translation along z
    #[argh(option, default = "0.0")]
    tz: f64,

    /// interpret the edit in COLMAP axes instead of the Y-up editor convention
    #[argh(switch)]
    no_bridge_import: bool,

    /// keep the editor convention in the written model
    #[argh(switch)]
    no_bridge_export: bool,

    /// write .txt files instead of .bin
    #[argh(switch)]
    text: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let model = colmap::read_model(&args.input)?;
    let mut binding = SceneBinding::bind(&model, !args.no_bridge_import)?;

    let rotation = DQuat::from_euler(
        EulerRot::XYZ,
        args.rx.to_radians(),
        args.ry.to_radians(),
        args.rz.to_radians(),
    );
    let edit = Similarity3::from_uniform(
        args.scale,
        rotation,
        DVec3::new(args.tx, args.ty, args.tz),
    );
    binding.set_root_transform(&edit);

    let format = if args.text {
        ModelFormat::Text
    } else {
        ModelFormat::Binary
    };
    let options = ExportOptions::default().with_apply_bridge(!args.no_bridge_export);
    let result = export_to_dir(&model, &binding, &options, &args.output, format)?;

    for warning in &result.warnings {
        println!("warning: {warning}");
    }
    println!(
        "wrote {} images and {} points to {} (intrinsics scaled by {})",
        result.reconstruction.images.len(),
        result.reconstruction.points3d.len(),
        args.output.display(),
        result.applied_scale
    );

    Ok(())
}
