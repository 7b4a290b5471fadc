use crate::background::BackgroundOptions;
use crate::pipeline::PipelineOptions;
use crate::types::ImagingSetup;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub imaging: ImagingSetup,
    #[serde(default)]
    pub pipeline: PipelineOptions,
    /// Temporally ordered frames.
    pub frames: Vec<FrameSource>,
    /// Flat-field the frames against a composite of the leading frames.
    /// Omitted → frames are used as loaded.
    #[serde(default)]
    pub background: Option<BackgroundOptions>,
    pub output: OutputConfig,
}

/// One frame image and the segmentation regions found in it.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameSource {
    pub image: PathBuf,
    /// JSON array of regions in `[row, col]` pixel coordinates.
    pub regions: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "report_json")]
    pub report_json: PathBuf,
}

impl RunConfig {
    /// Resolve relative frame and output paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for f in &mut self.frames {
            join(&mut f.image);
            join(&mut f.regions);
        }
        join(&mut self.output.report_json);
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let mut config: RunConfig = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::DiameterFloor;
    use crate::distribution::Weighting;
    use std::io::Write;

    #[test]
    fn minimal_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{
                "frames": [{{"image": "f0.png", "regions": "f0.json"}}],
                "output": {{"report_json": "out/report.json"}}
            }}"#
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.imaging, ImagingSetup::default());
        assert_eq!(cfg.pipeline, PipelineOptions::default());
        assert!(cfg.background.is_none());
        assert_eq!(cfg.frames[0].image, dir.path().join("f0.png"));
        assert_eq!(cfg.output.report_json, dir.path().join("out/report.json"));
    }

    #[test]
    fn nested_options_override_defaults() {
        let json = r#"{
            "imaging": {"resolution": 5e-6, "frame_delay": 2e-4},
            "pipeline": {
                "filter": {"diameter_floor": {"meters": 30e-6}, "focus_window": {"patch": {"pad_px": 8}}},
                "weighting": "raw"
            },
            "background": {"frame_count": 10},
            "frames": [],
            "output": {"report_json": "/tmp/r.json"}
        }"#;
        let cfg: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.imaging.resolution, 5e-6);
        assert_eq!(cfg.imaging.sensor.along_flow_px, 1024);
        assert_eq!(cfg.pipeline.filter.diameter_floor, DiameterFloor::Meters(30e-6));
        assert_eq!(cfg.pipeline.filter.circularity_min, 0.7);
        assert_eq!(cfg.pipeline.weighting, Weighting::Raw);
        let bg = cfg.background.unwrap();
        assert_eq!(bg.frame_count, 10);
        assert_eq!(bg.percentile, 0.8);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/run.json")).unwrap_err();
        assert!(err.contains("/nonexistent/run.json"), "{err}");
    }
}
