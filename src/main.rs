use anyhow::{Context, bail};
use eframe::egui;
use env_logger::Builder;
use log::{LevelFilter, info};
use std::path::PathBuf;

use tabletop_fog::common::config::FogConfig;
use tabletop_fog::common::scene::load_scene;
use tabletop_fog::render::export::export_png;

mod ui;

use ui::AppState;

/// Device pixels per map unit for headless export.
const EXPORT_PIXELS_PER_UNIT: f32 = 1.0;

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    scene: Option<String>,
    png: Option<PathBuf>,
}

/// Parse `[scene.json] [--png out.png]`.
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--png" {
            let out = args.next().context("--png needs an output path")?;
            parsed.png = Some(PathBuf::from(out));
        } else if arg.starts_with("--") {
            bail!("Unknown option: {}", arg);
        } else if parsed.scene.is_none() {
            parsed.scene = Some(arg);
        } else {
            bail!("Unexpected argument: {}", arg);
        }
    }
    if parsed.png.is_some() && parsed.scene.is_none() {
        bail!("--png requires a scene file");
    }
    Ok(parsed)
}

fn export(scene_path: &str, out: &std::path::Path) -> anyhow::Result<()> {
    let scene = load_scene(scene_path).with_context(|| format!("Cannot export {}", scene_path))?;
    let config = FogConfig::for_scene(scene_path);
    export_png(&scene, &config, EXPORT_PIXELS_PER_UNIT, out)
}

fn main() -> anyhow::Result<()> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("tabletop_fog"), LevelFilter::Debug)
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    if let (Some(scene), Some(out)) = (&args.scene, &args.png) {
        info!("Exporting fog for {} to {}", scene, out.display());
        return export(scene, out);
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    let initial_scene = args.scene;
    eframe::run_native(
        "Tabletop Fog",
        native_options,
        Box::new(move |cc| Ok(Box::new(AppState::new(cc.storage, initial_scene)))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_scene_and_png() {
        let parsed = parse_args(args(&["scene.json", "--png", "out.png"])).unwrap();
        assert_eq!(parsed.scene.as_deref(), Some("scene.json"));
        assert_eq!(parsed.png, Some(PathBuf::from("out.png")));
    }

    #[test]
    fn no_args_opens_picker() {
        assert_eq!(parse_args(args(&[])).unwrap(), CliArgs::default());
    }

    #[test]
    fn rejects_bad_args() {
        assert!(parse_args(args(&["--png"])).is_err());
        assert!(parse_args(args(&["--png", "out.png"])).is_err());
        assert!(parse_args(args(&["a.json", "b.json"])).is_err());
        assert!(parse_args(args(&["--zoom", "2"])).is_err());
    }
}
