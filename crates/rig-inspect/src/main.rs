use std::{env, error::Error, path::PathBuf, process::ExitCode};

use log::{error, info, warn};
use rig_asset::{
    loader::{load_from_path, ContainerKind},
    params::RigParams,
    pose::{swing_locals, SkinPose},
    primitive::{skinned_primitives, validate_primitive_skin},
    skin::build_skins,
    uniform::BoneBuffer,
};

const SWING_FRAMES: usize = 4;
const FRAME_TIME: f32 = 1.0 / 60.0;

struct Args {
    path: PathBuf,
    strict: bool,
}

fn parse_args() -> Option<Args> {
    let mut path = None;
    let mut strict = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--strict" => strict = true,
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => return None,
        }
    }
    Some(Args { path: path?, strict })
}

fn inspect(args: &Args) -> Result<(), Box<dyn Error>> {
    let params = if args.strict {
        RigParams::strict()
    } else {
        RigParams::default()
    };

    let kind = ContainerKind::from_path(&args.path);
    info!("Loading {} as {:?}", args.path.display(), kind);
    let document = load_from_path(&args.path)?;
    if !document.warnings().is_empty() {
        warn!("{} load warnings", document.warnings().len());
    }

    let skins = build_skins(&document, &params)?;
    for skin in &skins {
        info!(
            "Skin #{} {:?}: {} bones, roots {:?}",
            skin.index,
            skin.name,
            skin.len(),
            skin.roots().collect::<Vec<_>>()
        );
    }

    for item in skinned_primitives(&document) {
        let (Some(skin), Some(primitive)) = (
            skins.get(item.skin),
            document.primitive(item.mesh, item.primitive),
        ) else {
            continue;
        };
        let report = validate_primitive_skin(&document, skin, &primitive, &params)?;
        info!(
            "Node #{} mesh #{} primitive #{}: {} vertices valid, {} drifted",
            item.node, item.mesh, item.primitive, report.vertices, report.drifted
        );
    }

    for skin in &skins {
        let mut pose = SkinPose::new(skin);
        let mut buffer = BoneBuffer::new(skin, &pose)?;
        for frame in 0..SWING_FRAMES {
            let locals = swing_locals(skin, frame as f32 * FRAME_TIME);
            pose.set_local_pose(skin, &locals)?;
            buffer.update(&pose)?;
        }
        info!(
            "Skin #{}: bone buffer of {} bytes",
            skin.index,
            buffer.as_bytes().len()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(args) = parse_args() else {
        eprintln!("Usage: rig-inspect <model.gltf|model.glb|model.vrm> [--strict]");
        return ExitCode::FAILURE;
    };
    match inspect(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}: {}", args.path.display(), err);
            ExitCode::FAILURE
        }
    }
}
