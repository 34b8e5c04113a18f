use anyhow::{Context, Result};

use enex2md::evernote::RenderContext;
use enex2md::markdown::EnmlRenderer;

use crate::app::App;

pub fn run(app: &App) -> Result<()> {
    let notepad = app.load_notepad()?;

    println!("Input file: {}", app.input.display());
    println!("Output directory: {}", app.output_dir.display());

    let renderer = EnmlRenderer::new();
    let snapshot = app.snapshot_writer();
    let ctx = RenderContext {
        markup: &renderer,
        snapshot: snapshot.as_ref(),
    };

    let written = notepad
        .write_all(
            &app.output_dir,
            &app.attachment_dir,
            app.config.dump_resources,
            &ctx,
            |progress| println!("{} {}", progress, progress.path.display()),
        )
        .context("Conversion failed")?;

    println!("Converted {} notes ({} files written)", notepad.len(), written.len());
    Ok(())
}
