use pageview::test_utils::test_helpers::ScriptedDocument;
use pageview::{ControllerOptions, PageViewController, PixelSurface, ViewerError};

fn painted_controller(
    export_dir: &std::path::Path,
) -> PageViewController<ScriptedDocument, PixelSurface> {
    let mut controller = PageViewController::initialize(
        ScriptedDocument::letter(4).titled("notes"),
        PixelSurface::new(1.0),
        ControllerOptions {
            initial_scale: 0.25,
            export_dir: Some(export_dir.to_path_buf()),
            ..ControllerOptions::default()
        },
    )
    .unwrap();
    controller.document_mut().finish_next().unwrap();
    controller.poll_renders().unwrap();
    controller
}

fn live_exports(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn second_export_releases_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = painted_controller(dir.path());

    let first = controller.export_current_page().unwrap().path().to_path_buf();
    assert!(first.exists());
    assert_eq!(live_exports(dir.path()), 1);

    let second = controller.export_current_page().unwrap();
    assert_eq!(second.serial(), 2);
    let second = second.path().to_path_buf();

    assert!(!first.exists());
    assert!(second.exists());
    assert_eq!(live_exports(dir.path()), 1);
}

#[test]
fn exported_png_matches_backing_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut controller = painted_controller(dir.path());
    let path = controller.export_current_page().unwrap().path().to_path_buf();

    let (width, height) = image::image_dimensions(&path).unwrap();
    // 612x792 at 0.25
    assert_eq!((width, height), (153, 198));
}

#[test]
fn teardown_releases_the_live_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = {
        let mut controller = painted_controller(dir.path());
        controller.export_current_page().unwrap().path().to_path_buf()
    };
    assert!(!path.exists());
    assert_eq!(live_exports(dir.path()), 0);
}

#[test]
fn download_uses_page_of_last_render() {
    let dir = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let mut controller = painted_controller(dir.path());

    controller.go_to_next_page().unwrap();
    controller.document_mut().finish_next().unwrap();
    controller.poll_renders().unwrap();

    controller.export_current_page().unwrap();
    let dest = controller.download_export(downloads.path()).unwrap();
    assert_eq!(dest, downloads.path().join("notes-page-2.png"));
    assert!(dest.exists());
}

#[test]
fn download_without_export_fails() {
    let dir = tempfile::tempdir().unwrap();
    let controller = painted_controller(dir.path());
    assert!(matches!(
        controller.download_export(dir.path()),
        Err(ViewerError::NothingToExport)
    ));
}
