use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    let notepad = app.load_notepad()?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&notepad.preview())?);
        }
        OutputFormat::Plain => {
            if notepad.is_empty() {
                println!("(no notes)");
            }
            for line in notepad.list_summary() {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
