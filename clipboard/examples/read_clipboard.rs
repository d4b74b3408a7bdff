//! Clipboard reading demo.
fn main() -> clipkit_clipboard::Result<()> {
    println!("Reading clipboard...");
    let broker = clipkit_clipboard::init()?;

    let kinds = broker.available_kinds()?;
    println!("Clipboard holds: {kinds:?}");

    match broker.read_text()? {
        Some(text) => println!("Clipboard text content:\n{text}"),
        None => println!("Clipboard does not contain text."),
    }

    match broker.read_paths() {
        Ok(Some(paths)) => {
            for path in paths {
                println!("File: {path}");
            }
        }
        Ok(None) => println!("Clipboard does not contain files."),
        Err(err) => println!("File lists unavailable: {err}"),
    }

    match broker.read(clipkit_clipboard::ContentKind::Image)? {
        Some(png) => {
            println!("Clipboard contains image ({} bytes of PNG)", png.len());

            // Save to file for preview
            match std::fs::write("clipboard_preview.png", &png) {
                Ok(()) => println!("Image saved to clipboard_preview.png"),
                Err(e) => println!("Failed to save image: {e}"),
            }
        }
        None => println!("Clipboard does not contain image."),
    }

    Ok(())
}
