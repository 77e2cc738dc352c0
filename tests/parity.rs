mod parity {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::mpsc;

    use audiogram::audio::amplitude::AmplitudeCurve;
    use audiogram::export::{CancelToken, ExportJob, InMemorySink, run_with_sink};
    use audiogram::{
        Canvas, CaptionSegment, CaptionTrack, Compositor, Fps, LayoutConfig, RenderInputs,
        StyleConfig, WordSpan,
    };

    const CANVAS: Canvas = Canvas {
        width: 64,
        height: 36,
    };

    fn talking_head_inputs() -> RenderInputs {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let words = vec![
            WordSpan {
                word: "tune".to_string(),
                start: 0.0,
                end: 0.4,
            },
            WordSpan {
                word: "in".to_string(),
                start: 0.4,
                end: 1.0,
            },
        ];
        let captions = CaptionTrack::new(vec![CaptionSegment {
            text: "tune in".to_string(),
            start: 0.0,
            end: 1.0,
            words,
        }]);
        RenderInputs {
            style: StyleConfig::default(),
            layout: LayoutConfig::default(),
            captions,
            amplitude: AmplitudeCurve::from_values(vec![
                0.1, 0.8, 0.4, 1.0, 0.6, 0.2, 0.9, 0.3, 0.7, 0.5,
            ]),
            logo: None,
            background: None,
            duration: 1.0,
        }
    }

    fn job(inputs: &Arc<RenderInputs>, threads: Option<usize>) -> ExportJob {
        ExportJob {
            inputs: Arc::clone(inputs),
            audio: None,
            out_path: PathBuf::from("/tmp/audiogram-parity-never-written.mp4"),
            fps: Fps::TIMELINE,
            canvas: CANVAS,
            threads,
        }
    }

    fn export_to_memory(job: &ExportJob) -> InMemorySink {
        let mut sink = InMemorySink::new();
        let cancel = CancelToken::new();
        let (tx, _rx) = mpsc::channel();
        run_with_sink(job, &mut sink, &cancel, &tx).unwrap();
        sink
    }

    /// The frame a viewer scrubs to in the preview is the frame the export writes.
    #[test]
    fn exported_frames_match_direct_renders() {
        let inputs = Arc::new(talking_head_inputs());
        let sink = export_to_memory(&job(&inputs, None));
        assert_eq!(sink.frames().len(), 30);

        let mut compositor = Compositor::new(CANVAS);
        for (idx, exported) in sink.frames() {
            let time = Fps::TIMELINE.frames_to_secs(*idx);
            let direct = compositor.render(&inputs, time).unwrap();
            assert_eq!(
                (exported.width, exported.height),
                (direct.width, direct.height)
            );
            assert_eq!(
                exported.data, direct.data,
                "frame {} diverged from the preview render",
                idx.0
            );
        }
    }

    #[test]
    fn thread_count_does_not_change_the_pixels() {
        let inputs = Arc::new(talking_head_inputs());
        let sink_global = export_to_memory(&job(&inputs, None));
        let sink_three = export_to_memory(&job(&inputs, Some(3)));

        assert_eq!(sink_global.frames().len(), sink_three.frames().len());
        for ((idx_a, a), (idx_b, b)) in sink_global
            .frames()
            .iter()
            .zip(sink_three.frames().iter())
        {
            assert_eq!(idx_a, idx_b);
            assert_eq!(a.data, b.data, "frame {} differs across pools", idx_a.0);
        }
    }
}
