use upscale_bridge::sim::{SimEvent, SimHost};
use upscale_bridge::{
    CPluginBackend, Extent, PluginExports, RenderPassEvent, TeardownReport, UpscaleFeature,
    UpscalePipeline, UpscaleSettings,
};

fn run_frames<D, B>(pipeline: &mut UpscalePipeline<D, B>, host: &SimHost, n: usize)
where
    D: upscale_bridge::RenderDevice,
    B: upscale_bridge::NativeBackend,
{
    let mut camera = host.camera();
    let base = Extent::new(800, 600);
    for _ in 0..n {
        let mut cmd = host.command_stream();
        let mut ctx = pipeline.begin_frame(base, &mut camera).unwrap();
        let source = host.source(camera.render_extent(base));
        ctx.execute(&mut cmd, Some(&source));
    }
}

#[test]
fn teardown_releases_buffer_and_callbacks_exactly_once() {
    let host = SimHost::new();
    let mut pipeline =
        UpscalePipeline::new(UpscaleSettings::default(), host.device(), host.backend()).unwrap();
    run_frames(&mut pipeline, &host, 5);

    let report = pipeline.teardown();
    assert_eq!(
        report,
        TeardownReport {
            buffer_released: true,
            callbacks_released: true,
            frames: 5,
        }
    );

    let ledger = host.ledger();
    assert_eq!(ledger.count(|e| matches!(e, SimEvent::Release { .. })), 1);
    assert_eq!(
        ledger.count(|e| matches!(e, SimEvent::SetLogCallback(false))),
        1
    );
    assert!(ledger.live_targets.is_empty());

    // Deregistration is the last native call; nothing follows it.
    let native = ledger.native_calls();
    assert_eq!(native.last(), Some(&SimEvent::SetLogCallback(false)));
}

#[test]
fn dropping_the_pipeline_tears_down_once() {
    let host = SimHost::new();
    {
        let mut pipeline =
            UpscalePipeline::new(UpscaleSettings::default(), host.device(), host.backend())
                .unwrap();
        run_frames(&mut pipeline, &host, 2);
    }

    let ledger = host.ledger();
    assert_eq!(ledger.count(|e| matches!(e, SimEvent::Release { .. })), 1);
    assert_eq!(
        ledger.count(|e| matches!(e, SimEvent::SetLogCallback(false))),
        1
    );
}

#[test]
fn teardown_before_any_frame_releases_only_callbacks() {
    let host = SimHost::new();
    let pipeline =
        UpscalePipeline::new(UpscaleSettings::default(), host.device(), host.backend()).unwrap();

    let report = pipeline.teardown();
    assert!(!report.buffer_released);
    assert!(report.callbacks_released);
    assert_eq!(
        host.ledger()
            .count(|e| matches!(e, SimEvent::Release { .. })),
        0
    );
}

#[test]
fn initialization_registers_callbacks_then_fetches_token() {
    let host = SimHost::new();
    let _pipeline =
        UpscalePipeline::new(UpscaleSettings::default(), host.device(), host.backend()).unwrap();

    assert_eq!(
        host.ledger().native_calls(),
        vec![SimEvent::SetLogCallback(true), SimEvent::GetRenderEventFunc]
    );
}

#[test]
fn missing_render_event_disables_the_feature() {
    let host = SimHost::new();
    host.without_render_event();

    let mut feature =
        UpscaleFeature::create(UpscaleSettings::default(), host.device(), host.backend());
    assert!(!feature.is_enabled());
    assert!(feature.pipeline().is_none());

    let native_after_init = host.ledger().native_calls().len();
    let mut camera = host.camera();
    for _ in 0..3 {
        let ctx = feature
            .begin_frame(Extent::new(800, 600), &mut camera)
            .unwrap();
        assert!(ctx.is_none());
    }

    // Registration was rolled back at init; frames made no native calls and left the camera alone.
    let ledger = host.ledger();
    assert_eq!(
        ledger.count(|e| matches!(e, SimEvent::SetLogCallback(false))),
        1
    );
    assert_eq!(ledger.native_calls().len(), native_after_init);
    assert_eq!(camera.render_scale(), 1.0);
    drop(ledger);

    assert!(feature.dispose().is_none());
}

#[test]
fn missing_native_export_disables_the_feature() {
    let err = unsafe { CPluginBackend::from_exports(PluginExports::default()) }.unwrap_err();
    assert!(err.is_boundary());
    assert!(err.to_string().contains("SetLogCallback"));
}

#[test]
fn enabled_feature_drives_frames_and_disposes() {
    let host = SimHost::new();
    let settings = UpscaleSettings {
        render_pass_event: RenderPassEvent::BeforeRenderingPostProcessing,
        ..UpscaleSettings::default()
    };
    let mut feature = UpscaleFeature::create(settings, host.device(), host.backend());
    assert!(feature.is_enabled());
    assert_eq!(
        feature.render_pass_event(),
        RenderPassEvent::BeforeRenderingPostProcessing
    );

    let mut camera = host.camera();
    {
        let mut cmd = host.command_stream();
        let mut ctx = feature
            .begin_frame(Extent::new(800, 600), &mut camera)
            .unwrap()
            .unwrap();
        let source = host.source(Extent::new(400, 300));
        assert!(ctx.execute(&mut cmd, Some(&source)).is_upscaled());
    }

    feature.apply_settings(UpscaleSettings {
        upscale_scale: 1.0,
        ..UpscaleSettings::default()
    });
    assert_eq!(
        feature.pipeline().map(|p| p.policy().upscale_factor()),
        Some(1.0)
    );

    let report = feature.dispose().unwrap();
    assert_eq!(report.frames, 1);
    assert!(report.buffer_released);
    assert!(host.ledger().live_targets.is_empty());
}
