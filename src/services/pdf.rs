use std::io::{BufWriter, Cursor};

use printpdf::*;

use crate::{error::AppError, models::trip::TripResponse};

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const TOP: f64 = 275.0;
const BOTTOM: f64 = 20.0;
const LEFT: f64 = 20.0;
const WRAP_AT: usize = 90;

/// Renders the itinerary as an A4 document. CPU-bound, so it runs on the
/// blocking pool.
pub async fn render_itinerary_pdf(trip: &TripResponse) -> Result<Vec<u8>, AppError> {
    let trip = trip.clone();
    tokio::task::spawn_blocking(move || build_document(&trip))
        .await
        .map_err(|err| AppError::Pdf(err.to_string()))?
}

fn build_document(trip: &TripResponse) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) =
        PdfDocument::new(trip.trip_name.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|err| AppError::Pdf(err.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|err| AppError::Pdf(err.to_string()))?;

    let mut writer = PageWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: TOP,
    };

    writer.line(&trip.trip_name, 22.0, &font_bold, 14.0);
    let dates = format!("{} to {}", trip.trip_start, trip.trip_end);
    let days = trip.num_days.to_string();
    let fields = [
        ("Location", trip.location.as_str()),
        ("Dates", dates.as_str()),
        ("Days", days.as_str()),
        ("Traveling with", trip.traveling_with.as_str()),
        ("Lodging", trip.lodging.as_str()),
        ("Activities", trip.adventure.as_str()),
    ];
    for (label, value) in fields {
        writer.labelled(label, value, &font_bold, &font);
    }

    for item in &trip.itinerary {
        writer.gap(6.0);
        writer.line(&format!("Day {} - {}", item.day, item.date), 14.0, &font_bold, 8.0);
        writer.labelled("Morning", &item.morning, &font_bold, &font);
        writer.labelled("Afternoon", &item.afternoon, &font_bold, &font);
        writer.labelled("Evening", &item.evening, &font_bold, &font);
        if let Some(weather) = &item.weather {
            writer.labelled("Weather", weather, &font_bold, &font);
        }
    }

    let mut buf = BufWriter::new(Cursor::new(Vec::new()));
    doc.save(&mut buf)
        .map_err(|err| AppError::Pdf(err.to_string()))?;
    let cursor = buf
        .into_inner()
        .map_err(|err| AppError::Pdf(err.to_string()))?;
    Ok(cursor.into_inner())
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f64,
}

impl PageWriter<'_> {
    fn ensure_room(&mut self, needed: f64) {
        if self.y - needed >= BOTTOM {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    fn gap(&mut self, height: f64) {
        self.y -= height;
    }

    fn line(&mut self, text: &str, size: f64, font: &IndirectFontRef, advance: f64) {
        self.ensure_room(advance);
        self.layer.use_text(text, size, Mm(LEFT), Mm(self.y), font);
        self.y -= advance;
    }

    fn labelled(&mut self, label: &str, value: &str, bold: &IndirectFontRef, font: &IndirectFontRef) {
        let lines = wrap(value, WRAP_AT);
        self.ensure_room(6.0 * lines.len().max(1) as f64);
        self.layer
            .use_text(format!("{label}:"), 11.0, Mm(LEFT), Mm(self.y), bold);
        for (idx, text) in lines.iter().enumerate() {
            if idx > 0 {
                self.ensure_room(6.0);
            }
            self.layer
                .use_text(text.as_str(), 11.0, Mm(LEFT + 30.0), Mm(self.y), font);
            self.y -= 6.0;
        }
        if lines.is_empty() {
            self.y -= 6.0;
        }
    }
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
