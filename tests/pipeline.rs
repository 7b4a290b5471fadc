mod common;

use common::synthetic_image::{droplet_frame_u8, SyntheticDroplet};
use droplet_sizing::candidate::FilterOptions;
use droplet_sizing::focus::FocusWindow;
use droplet_sizing::image::{ImageF32, ImageU8};
use droplet_sizing::pipeline::{Frame, PipelineOptions, SequenceProcessor};
use droplet_sizing::types::ImagingSetup;
use droplet_sizing::{Distribution, Weighting};

const WIDTH: usize = 256;
const HEIGHT: usize = 128;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> ImagingSetup {
    ImagingSetup {
        resolution: 1e-5,
        frame_delay: 1e-4,
        ..Default::default()
    }
}

fn frame(id: &str, droplets: &[SyntheticDroplet]) -> Frame {
    let buffer = droplet_frame_u8(WIDTH, HEIGHT, droplets);
    let view = ImageU8 {
        w: WIDTH,
        h: HEIGHT,
        stride: WIDTH,
        data: &buffer,
    };
    Frame {
        id: id.to_string(),
        image: ImageF32::from_u8(&view),
        regions: droplets
            .iter()
            .enumerate()
            .map(|(i, d)| d.region(i as u32 + 1))
            .collect(),
    }
}

#[test]
fn droplet_moving_downstream_is_tracked_and_sized() {
    init_logger();
    let d1 = SyntheticDroplet::sharp(64.0, 60.0, 12.0);
    let d2 = SyntheticDroplet::sharp(64.0, 90.0, 12.0);
    let frames = vec![Some(frame("f0", &[d1])), Some(frame("f1", &[d2]))];

    let proc = SequenceProcessor::new(setup(), PipelineOptions::default()).unwrap();
    let report = proc.run(&frames);

    assert_eq!(report.frames.len(), 2);
    assert_eq!(report.frames[0].admitted, 1, "{:?}", report.frames[0]);
    assert_eq!(report.tracked.len(), 1);
    assert!(report.rejected.is_empty());

    let droplet = &report.tracked[0];
    assert_eq!(droplet.image, "f0");
    assert!((droplet.velocity - 3.0).abs() < 1e-9, "v={}", droplet.velocity);
    assert!((droplet.diameter - 24e-5).abs() < 1e-12);

    let summary = report.distribution.summary().expect("one droplet");
    assert_eq!(summary.count, 1);
    assert!((summary.dv50_um - 240.0).abs() < 1e-6, "{summary:?}");
    assert!(summary.span.abs() < 1e-12);
    assert!(report.histogram.is_some());
}

#[test]
fn patch_focus_rejects_blurred_droplet() {
    init_logger();
    let frames = vec![
        Some(frame(
            "f0",
            &[
                SyntheticDroplet::sharp(64.0, 60.0, 12.0),
                SyntheticDroplet::blurred(64.0, 170.0, 12.0, 12.0),
            ],
        )),
        Some(frame(
            "f1",
            &[
                SyntheticDroplet::sharp(64.0, 90.0, 12.0),
                SyntheticDroplet::blurred(64.0, 200.0, 12.0, 12.0),
            ],
        )),
    ];
    let options = PipelineOptions {
        filter: FilterOptions {
            focus_window: FocusWindow::Patch { pad_px: 16 },
            ..Default::default()
        },
        ..Default::default()
    };

    let proc = SequenceProcessor::new(setup(), options).unwrap();
    let report = proc.run(&frames);

    for f in &report.frames {
        assert_eq!(f.admitted, 1, "{f:?}");
        assert_eq!(f.rejected.out_of_focus, 1, "{f:?}");
    }
    assert_eq!(report.tracked.len(), 1);
    assert_eq!(report.tracked[0].centroids[0], [64.0, 60.0]);
}

#[test]
fn droplet_leaving_the_frame_is_rejected_not_lost() {
    init_logger();
    let frames = vec![
        Some(frame("f0", &[SyntheticDroplet::sharp(64.0, 60.0, 12.0)])),
        Some(frame("f1", &[])),
    ];
    let proc = SequenceProcessor::new(setup(), PipelineOptions::default()).unwrap();
    let report = proc.run(&frames);

    assert!(report.tracked.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.distribution, Distribution::Empty { excluded: 0 });
}

#[test]
fn longer_sequence_accumulates_across_pairs() {
    init_logger();
    let frames: Vec<Option<Frame>> = (0..4)
        .map(|i| {
            let col = 40.0 + 30.0 * i as f64;
            Some(frame(
                &format!("f{i}"),
                &[SyntheticDroplet::sharp(64.0, col, 12.0)],
            ))
        })
        .collect();
    let options = PipelineOptions {
        weighting: Weighting::Raw,
        ..Default::default()
    };
    let proc = SequenceProcessor::new(setup(), options).unwrap();
    let report = proc.run(&frames);

    assert_eq!(report.pairs.len(), 3);
    assert_eq!(report.tracked.len(), 3);
    assert_eq!(report.distribution.count(), 3);
    let mut images: Vec<&str> = report.tracked.iter().map(|d| d.image.as_str()).collect();
    images.sort_unstable();
    assert_eq!(images, ["f0", "f1", "f2"]);
}

#[test]
fn report_serializes_to_json() {
    let frames = vec![
        Some(frame("f0", &[SyntheticDroplet::sharp(64.0, 60.0, 12.0)])),
        Some(frame("f1", &[SyntheticDroplet::sharp(64.0, 90.0, 12.0)])),
    ];
    let proc = SequenceProcessor::new(setup(), PipelineOptions::default()).unwrap();
    let report = proc.run(&frames);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["distribution"]["status"], "computed");
    assert!(json["distribution"]["dv50Um"].is_number());
    assert_eq!(json["tracked"].as_array().map(Vec::len), Some(1));
}
