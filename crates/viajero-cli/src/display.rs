//! Card rendering for chat results.
//!
//! Renders a [`ChatResult`] as a short human-readable card: the answer text,
//! then the image and numbered map links when enrichment produced them.

use std::fmt::Write;

use viajero_core::ChatResult;

const MAX_LINKS: usize = 10;

// ── Public API ──

/// Print a chat result as a card on stdout.
pub fn print_chat_card(result: &ChatResult) {
    print!("{}", render_chat_card(result));
}

/// Render a chat result as a card.
pub fn render_chat_card(result: &ChatResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Respuesta ===");
    let _ = writeln!(out, "{}", result.response_text.trim_end());
    let _ = writeln!(out);

    if let Some(url) = &result.image_url {
        let _ = writeln!(out, "Imagen");
        let _ = writeln!(out, "  {url}");
        let _ = writeln!(out);
    }

    if !result.map_links.is_empty() {
        let _ = writeln!(out, "Mapas");
        for (i, link) in result.map_links.iter().take(MAX_LINKS).enumerate() {
            let _ = writeln!(out, "  {:<3} {}", format!("{}.", i + 1), link.name);
            let _ = writeln!(out, "      {}", link.url);
        }
        if result.map_links.len() > MAX_LINKS {
            let _ = writeln!(out, "  ... y {} más", result.map_links.len() - MAX_LINKS);
        }
        let _ = writeln!(out);
    }

    out
}
