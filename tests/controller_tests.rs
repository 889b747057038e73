use pageview::document::{Frame, RenderResponse, RequestId};
use pageview::render_gate::RenderPhase;
use pageview::test_utils::test_helpers::ScriptedDocument;
use pageview::{ControllerOptions, PageViewController, PixelSurface, Surface, ViewerError};

type Controller = PageViewController<ScriptedDocument, PixelSurface>;

fn options(scale: f64) -> ControllerOptions {
    ControllerOptions {
        initial_scale: scale,
        ..ControllerOptions::default()
    }
}

fn open(pages: usize, scale: f64) -> Controller {
    PageViewController::initialize(
        ScriptedDocument::letter(pages),
        PixelSurface::new(1.0),
        options(scale),
    )
    .unwrap()
}

/// Complete the running render and feed the completion back
fn finish(controller: &mut Controller) {
    controller.document_mut().finish_next().expect("a render is running");
    controller.poll_renders().unwrap();
}

#[test]
fn initialize_renders_first_page() {
    let controller = open(10, 0.8);
    assert_eq!(controller.current_page(), 1);
    assert_eq!(controller.total_pages(), 10);
    assert_eq!(controller.document().started_pages(), vec![1]);
    assert_eq!(controller.render_phase(), RenderPhase::Rendering { page: 1 });
    assert_eq!(controller.page_label(), "1 / 10");
}

#[test]
fn initialize_rejects_empty_document() {
    let result = PageViewController::initialize(
        ScriptedDocument::letter(0),
        PixelSurface::new(1.0),
        ControllerOptions::default(),
    );
    assert!(matches!(result, Err(ViewerError::EmptyDocument)));
}

#[test]
fn three_sequential_next_pages_land_on_page_four() {
    let mut controller = open(10, 1.0);
    finish(&mut controller);

    for _ in 0..3 {
        controller.go_to_next_page().unwrap();
        finish(&mut controller);
    }

    assert_eq!(controller.current_page(), 4);
    assert_eq!(controller.document().started_pages(), vec![1, 2, 3, 4]);
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
}

#[test]
fn requests_during_render_coalesce_to_latest() {
    let mut controller = open(10, 1.0);
    finish(&mut controller);

    controller.request_render(3).unwrap();
    controller.request_render(5).unwrap();
    controller.request_render(7).unwrap();
    assert_eq!(controller.pending_page(), Some(7));
    assert_eq!(controller.document().running_count(), 1);

    finish(&mut controller);
    assert_eq!(controller.document().started_pages(), vec![1, 3, 7]);
    assert_eq!(controller.render_phase(), RenderPhase::Rendering { page: 7 });

    finish(&mut controller);
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
    assert_eq!(controller.document().started_pages(), vec![1, 3, 7]);
}

#[test]
fn coalescing_holds_for_any_run_of_requests() {
    let runs: [&[usize]; 4] = [&[2], &[4, 2], &[9, 1, 6, 3], &[5, 5, 5]];
    for run in runs {
        let mut controller = open(10, 1.0);
        for &page in run {
            controller.request_render(page).unwrap();
        }
        finish(&mut controller);

        let last = *run.last().unwrap();
        assert_eq!(controller.document().started_pages(), vec![1, last]);
    }
}

#[test]
fn at_most_one_render_in_flight_while_navigating() {
    let mut controller = open(10, 1.0);
    for _ in 0..5 {
        controller.go_to_next_page().unwrap();
        assert_eq!(controller.document().running_count(), 1);
    }
    assert_eq!(controller.current_page(), 6);
    assert_eq!(controller.pending_page(), Some(6));
    // label tracks what was sent to the renderer
    assert_eq!(controller.page_label(), "1 / 10");

    finish(&mut controller);
    assert_eq!(controller.page_label(), "6 / 10");
}

#[test]
fn previous_page_at_start_requests_nothing() {
    let mut controller = open(5, 1.0);
    finish(&mut controller);

    controller.go_to_previous_page().unwrap();
    assert_eq!(controller.current_page(), 1);
    assert_eq!(controller.document().started_pages(), vec![1]);
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
}

#[test]
fn next_page_at_end_requests_nothing() {
    let mut controller = open(2, 1.0);
    finish(&mut controller);
    controller.go_to_next_page().unwrap();
    finish(&mut controller);

    controller.go_to_next_page().unwrap();
    assert_eq!(controller.current_page(), 2);
    assert_eq!(controller.document().started_pages(), vec![1, 2]);
}

#[test]
fn zoom_round_trip_restores_scale() {
    let mut controller = open(3, 0.8);
    for _ in 0..5 {
        controller.zoom_in(0.1).unwrap();
    }
    for _ in 0..5 {
        controller.zoom_out(0.1).unwrap();
    }
    assert!((controller.scale() - 0.8).abs() < 1e-5);
}

#[test]
fn wheel_zoom_steps_and_stops_at_bound() {
    let mut controller = open(3, 1.0);
    finish(&mut controller);

    controller.zoom_on_wheel(true, 1).unwrap();
    assert!((controller.scale() - 1.1).abs() < 1e-6);
    finish(&mut controller);

    let mut at_max = open(3, 2.0);
    finish(&mut at_max);
    at_max.zoom_on_wheel(true, 1).unwrap();
    assert_eq!(at_max.scale(), 2.0);
    assert_eq!(at_max.document().started_pages(), vec![1]);
}

#[test]
fn wheel_zoom_out_reaches_point_four() {
    let mut controller = open(3, 0.8);
    finish(&mut controller);

    let mut steps = 0;
    loop {
        let before = controller.scale();
        controller.zoom_on_wheel(true, -1).unwrap();
        if controller.scale() == before {
            break;
        }
        steps += 1;
        finish(&mut controller);
    }

    assert_eq!(steps, 4);
    assert!((controller.scale() - 0.4).abs() < 1e-9);
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
}

#[test]
fn wheel_without_alt_is_ignored() {
    let mut controller = open(3, 1.0);
    controller.zoom_on_wheel(false, 1).unwrap();
    assert_eq!(controller.scale(), 1.0);
}

#[test]
fn viewport_sizes_follow_scale_and_pixel_ratio() {
    let mut controller = PageViewController::initialize(
        ScriptedDocument::with_pages(vec![(100.5, 200.25)]),
        PixelSurface::new(2.0),
        options(1.5),
    )
    .unwrap();

    let job = controller.document().started()[0].clone();
    // 100.5 * 1.5 = 150.75, 200.25 * 1.5 = 300.375
    assert_eq!((job.backing_width, job.backing_height), (301, 600));
    assert_eq!(job.transform.map(|t| t.scale_x()), Some(2.0));

    let display = controller.surface().display_box();
    assert_eq!((display.width, display.height), (150, 300));
    assert_eq!(controller.surface().backing_size(), (301, 600));

    finish(&mut controller);
    assert!(controller.surface().is_painted());
}

#[test]
fn unit_pixel_ratio_uses_no_transform() {
    let controller = open(1, 1.0);
    assert_eq!(controller.document().started()[0].transform, None);
}

#[test]
fn render_failure_clears_in_flight_and_drops_pending() {
    let mut controller = open(10, 1.0);
    controller.request_render(4).unwrap();
    assert_eq!(controller.pending_page(), Some(4));

    controller.document_mut().fail_next("surface lost");
    let err = controller.poll_renders().unwrap_err();
    assert!(matches!(err, ViewerError::Render { page: 1, .. }));
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
    assert_eq!(controller.pending_page(), None);

    // the user can re-trigger afterwards
    controller.go_to_next_page().unwrap();
    assert_eq!(controller.document().started_pages(), vec![1, 2]);
}

#[test]
fn failure_to_start_leaves_gate_idle() {
    let mut controller = open(10, 1.0);
    finish(&mut controller);

    controller.document_mut().fail_next_start();
    assert!(controller.go_to_next_page().is_err());
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
    assert_eq!(controller.current_page(), 2);
}

#[test]
fn out_of_range_request_while_idle_is_rejected() {
    let mut controller = open(3, 1.0);
    finish(&mut controller);

    for page in [0, 4] {
        let err = controller.request_render(page).unwrap_err();
        assert!(
            matches!(err, ViewerError::PageRange { page: p, total: 3 } if p == page),
            "unexpected error {err:?}"
        );
        assert_eq!(controller.render_phase(), RenderPhase::Idle);
    }
    assert_eq!(controller.document().started_pages(), vec![1]);
}

#[test]
fn out_of_range_pending_page_surfaces_on_completion() {
    let mut controller = open(3, 1.0);
    controller.request_render(9).unwrap();
    assert_eq!(controller.pending_page(), Some(9));

    controller.document_mut().finish_next().unwrap();
    let err = controller.poll_renders().unwrap_err();
    assert!(matches!(err, ViewerError::PageRange { page: 9, total: 3 }));
    assert_eq!(controller.render_phase(), RenderPhase::Idle);
    assert_eq!(controller.pending_page(), None);
    assert!(controller.surface().is_painted());
}

#[test]
fn stale_completion_is_ignored() {
    let mut controller = open(3, 1.0);
    controller.document_mut().push_response(RenderResponse::Rendered {
        id: RequestId::new(999),
        page: 2,
        frame: Frame::filled(1, 1, [0, 0, 0, 255]),
    });
    assert_eq!(controller.poll_renders().unwrap(), 1);
    assert_eq!(controller.render_phase(), RenderPhase::Rendering { page: 1 });
    assert!(!controller.surface().is_painted());
}

#[test]
fn drag_moves_surface_without_clamping() {
    let mut controller = open(1, 1.0);
    controller.begin_drag(30, 40);
    assert!(controller.is_dragging());

    controller.continue_drag(-500, 10);
    let display = controller.surface().display_box();
    assert_eq!((display.left, display.top), (-530, -30));

    // a second drag starts relative to the new position
    controller.end_drag();
    controller.begin_drag(0, 0);
    controller.continue_drag(10, 10);
    let display = controller.surface().display_box();
    assert_eq!((display.left, display.top), (-520, -20));

    controller.end_drag();
    controller.continue_drag(1000, 1000);
    assert_eq!(controller.surface().display_box().left, -520);
}

#[test]
fn export_before_first_paint_fails() {
    let mut controller = open(1, 1.0);
    assert!(matches!(
        controller.export_current_page(),
        Err(ViewerError::NothingToExport)
    ));
    assert!(controller.current_export().is_none());
}
