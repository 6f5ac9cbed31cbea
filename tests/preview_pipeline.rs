use std::sync::Arc;

use mermaidview::assets::{AssetBundle, ICON_DIR, Icon, LIBRARY_FILE};
use mermaidview::engine::MISSING_LIBRARY_STUB;
use mermaidview::html::{MermaidRenderer, RenderState, render_state_command};
use mermaidview::options::{RenderOptions, Sizing, Theme};
use mermaidview::quicklook::PreviewService;
use mermaidview::settings::SettingsStore;
use mermaidview::surface::{LiveSurface, SurfaceCommand, settings_preview};

fn bundle_in(dir: &std::path::Path) -> AssetBundle {
    std::fs::write(dir.join(LIBRARY_FILE), "window.mermaid = {};").unwrap();
    std::fs::create_dir_all(dir.join(ICON_DIR)).unwrap();
    std::fs::write(
        dir.join(ICON_DIR).join(format!("{}.png", Icon::Hand.file_stem())),
        [0x89, b'P', b'N', b'G'],
    )
    .unwrap();
    AssetBundle::load(dir)
}

#[test]
fn test_markdown_file_to_preview_page() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = MermaidRenderer::new(&bundle_in(dir.path()));
    let store = SettingsStore::open(dir.path().join("settings.json"));
    store.set_theme(Theme::Forest).unwrap();
    let service = PreviewService::new(renderer, store);

    let doc = dir.path().join("README.markdown");
    std::fs::write(
        &doc,
        "intro\n```mermaid\nsequenceDiagram\n  A->>B: hi\n```\n```mermaid\ngraph TD\n```\n",
    )
    .unwrap();

    let reply = service.preview(&doc, false).unwrap();
    assert_eq!(reply.title, "README.markdown");
    assert!(reply.html.starts_with("<!DOCTYPE html>"));
    assert!(reply.html.contains("window.mermaid = {};"));
    assert!(reply.html.contains("sequenceDiagram\n  A-&gt;&gt;B: hi</pre>"));
    assert!(!reply.html.contains("graph TD"));
    assert!(reply.html.contains("const selectedTheme = 'forest';"));
    assert!(reply.html.contains("data:image/png;base64,iVBORw=="));
}

#[test]
fn test_missing_assets_degrade_to_stub() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = MermaidRenderer::new(&AssetBundle::load(&dir.path().join("absent")));
    let html = renderer
        .generate_html("graph TD", &RenderOptions::default(), false)
        .unwrap();
    assert!(html.contains(MISSING_LIBRARY_STUB));
    assert!(html.contains("src=\"\""));
}

#[test]
fn test_thumbnail_png_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let service = PreviewService::new(
        MermaidRenderer::new(&AssetBundle::default()),
        SettingsStore::in_memory(),
    );
    let path = dir.path().join("chart.mmd");
    std::fs::write(&path, "graph LR\n  A-->B").unwrap();

    let thumb = service.thumbnail(&path, 128, 128).unwrap().unwrap();
    let png = thumb.to_png().unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    assert!(thumb.to_svg().starts_with("<svg"));
}

#[test]
fn test_editor_session() {
    let renderer = Arc::new(MermaidRenderer::new(&AssetBundle::default()));
    let options = RenderOptions {
        sizing: Sizing::Original,
        ..RenderOptions::default()
    };
    let mut surface = LiveSurface::new(
        Arc::clone(&renderer),
        RenderState::new("graph TD", &options, true, 1.0),
    )
    .with_options(options.clone());

    let SurfaceCommand::Load(page) = surface.load().unwrap() else {
        panic!("first command must load the page");
    };
    assert!(page.contains("updateDiagram(`graph TD`, 'dark', true, 1);"));
    assert!(page.contains("id=\"toolbar\""));

    let edited = RenderState::new("graph TD\n  A-->B", &options, true, 2.0);
    assert!(surface.update(edited.clone()).is_none());
    assert_eq!(
        surface.on_page_loaded(),
        SurfaceCommand::Evaluate(render_state_command(&edited))
    );

    let mut sample = settings_preview(renderer);
    assert!(sample.update(&options, false).unwrap().is_some());
    assert!(sample.update(&options, false).unwrap().is_none());
}
