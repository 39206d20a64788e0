//! Live detection pipeline.
//!
//! `Session` holds everything that survives between frames: the size policy
//! and the detector slots. `FrameProcessor::process` takes the session
//! explicitly, runs detection on one frame and draws the result.
//! `Pipeline` drives delivery: camera → processor → sink, applying menu
//! commands between frames.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbaImage};

use crate::annotate::{annotate, AnnotationStyle, Overlay};
use crate::classifier::LoadedClassifier;
use crate::control::{menu_items, MenuCommand};
use crate::detect::{DetectorKind, DetectorRegistry, Detections, MultiScaleParams, Resolved};
use crate::frame::Frame;
use crate::ingest::CameraSource;
use crate::sink::FrameSink;
use crate::size_policy::{SizePolicy, SizePreset};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Result of processing one frame.
#[derive(Clone, Debug)]
pub struct AnnotatedFrame {
    pub sequence: u64,
    /// Color buffer with the overlay drawn in.
    pub image: RgbaImage,
    pub overlay: Overlay,
    /// Minimum object size used for this frame; 0 when unconstrained.
    pub min_size_px: u32,
}

/// Per-run detection state.
pub struct Session {
    policy: SizePolicy,
    detectors: DetectorRegistry,
    ready: bool,
    unselected_reported: bool,
    frames_processed: u64,
    detections_total: u64,
}

impl Session {
    pub fn new(policy: SizePolicy, selected: DetectorKind) -> Self {
        Self {
            policy,
            detectors: DetectorRegistry::new(selected),
            ready: false,
            unselected_reported: false,
            frames_processed: 0,
            detections_total: 0,
        }
    }

    /// Install the classifier load outcome and mark the session ready.
    pub fn install(&mut self, loaded: LoadedClassifier) -> Result<()> {
        self.detectors.install(loaded.kind, loaded.slot)?;
        self.ready = true;
        Ok(())
    }

    /// True once a classifier load outcome has been installed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn policy(&self) -> &SizePolicy {
        &self.policy
    }

    pub fn set_relative_fruit_size(&mut self, fraction: f32) -> Result<()> {
        self.policy.set_relative_fruit_size(fraction)
    }

    pub fn apply_preset(&mut self, preset: SizePreset) {
        self.policy.apply_preset(preset);
    }

    pub fn detectors(&self) -> &DetectorRegistry {
        &self.detectors
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn detections_total(&self) -> u64 {
        self.detections_total
    }

    fn detect(&mut self, gray: &GrayImage, params: &MultiScaleParams) -> Detections {
        match self.detectors.resolve() {
            Resolved::Ready(detector) => match detector.detect_multi_scale(gray, params) {
                Ok(detections) => detections,
                Err(err) => {
                    log::warn!("{} detection failed: {:#}", detector.name(), err);
                    Detections::empty()
                }
            },
            // The loader already reported why the slot is absent.
            Resolved::Absent(_) => Detections::empty(),
            Resolved::Unselected(fault) => {
                if self.unselected_reported {
                    log::debug!("{}", fault);
                } else {
                    log::error!("{}", fault);
                    self.unselected_reported = true;
                }
                Detections::empty()
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SizePolicy::default(), DetectorKind::default())
    }
}

/// Runs detection on frames and draws the results.
#[derive(Clone, Debug, Default)]
pub struct FrameProcessor {
    style: AnnotationStyle,
}

impl FrameProcessor {
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style }
    }

    pub fn process(&self, session: &mut Session, frame: Frame) -> AnnotatedFrame {
        let sequence = frame.sequence;
        let (mut image, gray) = frame.into_buffers();

        let min_size_px = session.policy.threshold_for(gray.height());
        let params = MultiScaleParams::with_min_pixels(min_size_px);
        let detections = session.detect(&gray, &params);
        let overlay = annotate(&mut image, &detections, &self.style);

        session.frames_processed += 1;
        session.detections_total += detections.len() as u64;
        log::debug!(
            "frame {}: {} detections (min size {}px)",
            sequence,
            detections.len(),
            min_size_px
        );

        AnnotatedFrame {
            sequence,
            image,
            overlay,
            min_size_px,
        }
    }
}

/// Totals reported when a run ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detections: u64,
    pub min_size_px: u32,
}

pub struct Pipeline {
    source: CameraSource,
    sink: FrameSink,
    session: Session,
    processor: FrameProcessor,
    commands: Option<Receiver<MenuCommand>>,
    frame_interval: Duration,
    max_frames: Option<u64>,
}

enum Flow {
    Continue,
    Stop,
}

impl Pipeline {
    pub fn new(source: CameraSource, sink: FrameSink, session: Session) -> Self {
        Self {
            source,
            sink,
            session,
            processor: FrameProcessor::default(),
            commands: None,
            frame_interval: Duration::ZERO,
            max_frames: None,
        }
    }

    pub fn with_processor(mut self, processor: FrameProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_commands(mut self, commands: Receiver<MenuCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Pace delivery to `target_fps`; 0 delivers as fast as frames arrive.
    pub fn with_target_fps(mut self, target_fps: u32) -> Self {
        self.frame_interval = frame_interval(target_fps);
        self
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Deliver frames until a quit command, `max_frames`, or a camera error.
    ///
    /// The session must be ready; frame delivery does not start before the
    /// classifier load has completed.
    pub fn run(&mut self) -> Result<RunSummary> {
        if !self.session.is_ready() {
            return Err(anyhow!("classifier load has not completed; live view not enabled"));
        }
        let mut last_health_log = Instant::now();

        loop {
            if let Flow::Stop = self.apply_commands() {
                log::info!("pipeline: quit requested");
                break;
            }
            if self
                .max_frames
                .is_some_and(|max| self.session.frames_processed() >= max)
            {
                break;
            }

            let started = Instant::now();
            let frame = self.source.next_frame()?;
            let annotated = self.processor.process(&mut self.session, frame);
            if let Err(err) = self.sink.present(&annotated) {
                log::warn!("pipeline: frame {} not presented: {:#}", annotated.sequence, err);
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "camera health={} frames={} device={} detections={} min_size={}px",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.device,
                    self.session.detections_total(),
                    self.session.policy().absolute_pixels()
                );
                last_health_log = Instant::now();
            }

            let elapsed = started.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }

        if let Err(err) = self.sink.flush() {
            log::warn!("pipeline: {:#}", err);
        }
        Ok(RunSummary {
            frames: self.session.frames_processed(),
            detections: self.session.detections_total(),
            min_size_px: self.session.policy().absolute_pixels(),
        })
    }

    fn apply_commands(&mut self) -> Flow {
        let Some(commands) = &self.commands else {
            return Flow::Continue;
        };
        loop {
            match commands.try_recv() {
                Ok(MenuCommand::Preset(preset)) => {
                    self.session.apply_preset(preset);
                    log::info!("menu: {} selected", preset.label());
                }
                Ok(MenuCommand::ShowMenu) => {
                    for (i, item) in menu_items().iter().enumerate() {
                        log::info!("menu {}: {}", i + 1, item);
                    }
                }
                Ok(MenuCommand::Quit) => return Flow::Stop,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return Flow::Continue
                }
            }
        }
    }
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectorSlot, Rect, ScriptedDetector};
    use crate::error::ResourceLoadFailure;
    use image::Rgba;

    fn ready_session(rects: Vec<Rect>) -> Session {
        let mut session = Session::default();
        session
            .install(LoadedClassifier {
                kind: DetectorKind::Cascade,
                slot: DetectorSlot::Ready(Box::new(ScriptedDetector::new(rects))),
                digest: None,
            })
            .unwrap();
        session
    }

    fn frame(width: u32, height: u32, sequence: u64) -> Frame {
        Frame::from_rgba(
            RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255])),
            sequence,
        )
    }

    #[test]
    fn threshold_uses_gray_height() {
        let mut session = ready_session(vec![]);
        session.apply_preset(SizePreset::Fruit50);
        let out = FrameProcessor::default().process(&mut session, frame(640, 480, 0));
        assert_eq!(out.min_size_px, 240);
        assert_eq!(session.policy().absolute_pixels(), 240);
    }

    #[test]
    fn detections_are_drawn_and_counted() {
        let mut session = ready_session(vec![
            Rect::new(10, 40, 100, 100),
            Rect::new(200, 200, 120, 110),
        ]);
        let input = frame(640, 480, 3);
        let original = input.color().clone();
        let out = FrameProcessor::default().process(&mut session, input);

        assert_eq!(out.sequence, 3);
        assert_eq!(out.overlay.boxes.len(), 2);
        assert_eq!(out.overlay.labels[0].text, "banana0");
        assert_eq!(out.overlay.labels[1].text, "banana1");
        assert_ne!(out.image, original);
        assert_eq!(session.detections_total(), 2);
        assert_eq!(session.frames_processed(), 1);
    }

    #[test]
    fn min_size_filters_through_backend() {
        // 0.2 * 480 = 96: the 40px rect is below the minimum.
        let mut session = ready_session(vec![Rect::new(0, 30, 40, 40), Rect::new(300, 300, 100, 100)]);
        let out = FrameProcessor::default().process(&mut session, frame(640, 480, 0));
        assert_eq!(out.overlay.boxes, vec![Rect::new(300, 300, 100, 100)]);
    }

    #[test]
    fn absent_detector_leaves_frame_unchanged() {
        let mut session = Session::default();
        session
            .install(LoadedClassifier {
                kind: DetectorKind::Cascade,
                slot: DetectorSlot::Absent(ResourceLoadFailure::Empty {
                    path: "banana_classifier.xml".into(),
                }),
                digest: None,
            })
            .unwrap();
        let input = frame(64, 48, 0);
        let original = input.color().clone();
        let out = FrameProcessor::default().process(&mut session, input);
        assert!(out.overlay.is_empty());
        assert_eq!(out.image, original);
    }

    #[test]
    fn unselected_method_yields_no_detections() {
        let mut session = Session::default();
        let input = frame(64, 48, 0);
        let original = input.color().clone();
        let processor = FrameProcessor::default();
        let out = processor.process(&mut session, input);
        assert!(out.overlay.is_empty());
        assert_eq!(out.image, original);
        assert!(session.unselected_reported);
        processor.process(&mut session, frame(64, 48, 1));
        assert_eq!(session.frames_processed(), 2);
    }

    #[test]
    fn run_requires_ready_session() -> Result<()> {
        let source = CameraSource::new(crate::ingest::CameraConfig::default())?;
        let mut pipeline = Pipeline::new(source, FrameSink::discard(), Session::default());
        assert!(pipeline.run().is_err());
        Ok(())
    }

    #[test]
    fn fps_maps_to_interval() {
        assert_eq!(frame_interval(0), Duration::ZERO);
        assert_eq!(frame_interval(10), Duration::from_millis(100));
        assert_eq!(frame_interval(5000), Duration::from_millis(1));
    }
}
