use droplet_sizing::background::{composite_background, normalize_frame};
use droplet_sizing::config::{load_config, FrameSource, RunConfig};
use droplet_sizing::image::io::{load_grayscale_image, read_json_file, write_json_file};
use droplet_sizing::image::{GrayImageU8, ImageF32};
use droplet_sizing::types::Region;
use droplet_sizing::{Distribution, Frame, SequenceProcessor};
use log::warn;
use std::env;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;
    let processor = SequenceProcessor::new(config.imaging.clone(), config.pipeline.clone())
        .map_err(|e| format!("Invalid configuration: {e}"))?;

    let background = build_background(&config)?;
    let frames: Vec<Option<Frame>> = config
        .frames
        .iter()
        .map(|src| match load_frame(src, background.as_ref()) {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!("skipping {}: {err}", src.image.display());
                None
            }
        })
        .collect();

    let report = processor.run(&frames);
    write_json_file(&config.output.report_json, &report)?;

    match &report.distribution {
        Distribution::Computed(s) => println!(
            "Dv10={:.2} µm Dv50={:.2} µm Dv90={:.2} µm span={:.3} droplets={}",
            s.dv10_um, s.dv50_um, s.dv90_um, s.span, s.count
        ),
        Distribution::Empty { excluded } => println!(
            "No droplets contributed to the distribution ({} tracked, {excluded} excluded)",
            report.tracked.len()
        ),
    }
    println!("Saved report to {}", config.output.report_json.display());
    Ok(())
}

/// Composite background over the leading frames, when configured.
fn build_background(config: &RunConfig) -> Result<Option<GrayImageU8>, String> {
    let Some(opts) = &config.background else {
        return Ok(None);
    };
    let stack: Vec<GrayImageU8> = config
        .frames
        .iter()
        .take(opts.frame_count.max(1))
        .filter_map(|src| match load_grayscale_image(&src.image) {
            Ok(img) => Some(img),
            Err(err) => {
                warn!("background: {err}");
                None
            }
        })
        .collect();
    let views: Vec<_> = stack.iter().map(GrayImageU8::as_view).collect();
    composite_background(&views, opts.percentile)
        .map(Some)
        .map_err(|e| format!("Background estimation failed: {e}"))
}

fn load_frame(src: &FrameSource, background: Option<&GrayImageU8>) -> Result<Frame, String> {
    let gray = load_grayscale_image(&src.image)?;
    let gray = match background {
        Some(bg) => normalize_frame(&gray.as_view(), &bg.as_view()).map_err(|e| e.to_string())?,
        None => gray,
    };
    let regions: Vec<Region> = read_json_file(&src.regions)?;
    let id = src
        .image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| src.image.display().to_string());
    Ok(Frame {
        id,
        image: ImageF32::from_u8(&gray.as_view()),
        regions,
    })
}

fn usage() -> String {
    "Usage: droplet-sizing <config.json>".to_string()
}
