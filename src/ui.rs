use ratatui::prelude::*;
use ratatui::widgets::*;

use rdk::{Colour, Raster, Surface};

use crate::app::App;

fn braille_bit(sub_x: usize, sub_y: usize) -> u8 {
    match (sub_x, sub_y) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0,
    }
}

fn to_color(c: Colour) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// Rasterised stimulus as braille, one dot per `scale`×`scale` pixel block.
/// A braille dot is raised when any pixel of its block differs from the
/// background; the cell takes the colour of the first such pixel.
fn braille_lines(raster: &Raster, background: Colour, width: usize, height: usize) -> Vec<Line<'static>> {
    let (rw, rh) = raster.size();
    let bw = width * 2;
    let bh = height * 4;
    let scale = rw.div_ceil(bw).max(rh.div_ceil(bh)).max(1);
    let used_w = rw.div_ceil(scale).div_ceil(2);
    let pad = width.saturating_sub(used_w) / 2;
    let bg = to_color(background);

    let block_colour = |bx: usize, by: usize| -> Option<Colour> {
        for y in by * scale..((by + 1) * scale).min(rh) {
            for x in bx * scale..((bx + 1) * scale).min(rw) {
                match raster.pixel(x, y) {
                    Some(c) if c != background => return Some(c),
                    _ => {}
                }
            }
        }
        None
    };

    (0..height)
        .map(|cy| {
            let mut spans = Vec::with_capacity(width);
            spans.push(Span::styled(" ".repeat(pad), Style::default().bg(bg)));
            for cx in 0..width.saturating_sub(pad) {
                let mut bits = 0u8;
                let mut colour = None;
                for sy in 0..4 {
                    for sx in 0..2 {
                        if let Some(c) = block_colour(cx * 2 + sx, cy * 4 + sy) {
                            bits |= braille_bit(sx, sy);
                            colour.get_or_insert(c);
                        }
                    }
                }
                let ch = if bits == 0 {
                    ' '
                } else {
                    char::from_u32(0x2800 + bits as u32).unwrap_or(' ')
                };
                let fg = colour.map(to_color).unwrap_or(bg);
                spans.push(Span::styled(String::from(ch), Style::default().fg(fg).bg(bg)));
            }
            Line::from(spans)
        })
        .collect()
}

pub fn render(frame: &mut Frame, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(100, 200, 255)))
        .title(" Random Dot Kinematogram ")
        .title_style(Style::default().fg(Color::Rgb(130, 220, 255)).add_modifier(Modifier::BOLD));

    let area = frame.area();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(inner);

    // Status bar
    let total = app.session.trials().len();
    let sep = || Span::styled(" | ", Style::default().fg(Color::DarkGray));
    let mut status = vec![Span::styled(" \u{25CE} ", Style::default())];
    match app.status {
        Some(s) => {
            status.push(Span::styled(
                format!("Trial {}/{} ", s.trial_index + 1, total),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
            status.push(sep());
            status.push(Span::styled(
                format!("Direction {:.0}\u{00B0} ", s.direction),
                Style::default().fg(Color::Cyan),
            ));
            status.push(sep());
            status.push(Span::styled(
                format!("{} ", s.phase.label()),
                Style::default().fg(Color::Green),
            ));
        }
        None => status.push(Span::styled(
            format!("{} trials queued ", total),
            Style::default().fg(Color::Yellow),
        )),
    }
    status.push(sep());
    status.push(Span::styled(
        format!("Coherence {:.2} ", app.config.dots.coherence),
        Style::default().fg(Color::Rgb(200, 160, 255)),
    ));
    status.push(sep());
    status.push(Span::styled(
        format!("Dots {} ", app.config.dots.count),
        Style::default().fg(Color::Rgb(160, 140, 120)),
    ));
    frame.render_widget(Paragraph::new(Line::from(status)), chunks[0]);

    // Stimulus
    let fw = chunks[1].width as usize;
    let fh = chunks[1].height as usize;
    if fw > 0 && fh > 0 {
        let lines = braille_lines(app.session.surface(), app.config.window.background, fw, fh);
        frame.render_widget(Paragraph::new(lines), chunks[1]);
    }

    // Help bar
    if app.finished {
        let msg = Paragraph::new(Line::from(vec![
            Span::styled(" SESSION COMPLETE ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("Press ENTER to run again, Q to quit", Style::default().fg(Color::Gray)),
        ]));
        frame.render_widget(msg, chunks[2]);
    } else if app.paused {
        let msg = Paragraph::new(Line::from(vec![
            Span::styled(" PAUSED - Press P to resume ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]));
        frame.render_widget(msg, chunks[2]);
    } else {
        let help = Paragraph::new(Line::from(vec![
            Span::styled(" P Pause ", Style::default().fg(Color::DarkGray)),
            Span::styled("| ", Style::default().fg(Color::Rgb(60, 60, 60))),
            Span::styled("R Restart ", Style::default().fg(Color::DarkGray)),
            Span::styled("| ", Style::default().fg(Color::Rgb(60, 60, 60))),
            Span::styled("Q/Esc Quit", Style::default().fg(Color::DarkGray)),
        ]));
        frame.render_widget(help, chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_raster_renders_spaces() {
        let raster = Raster::new(40, 40, Colour::BLACK);
        let lines = braille_lines(&raster, Colour::BLACK, 20, 10);
        assert_eq!(lines.len(), 10);
        for line in &lines {
            assert!(line.spans.iter().all(|s| s.content.chars().all(|c| c == ' ')));
        }
    }

    #[test]
    fn lit_pixel_raises_a_braille_dot() {
        let mut raster = Raster::new(40, 40, Colour::BLACK);
        raster.fill_square((0.5, 0.5), 1, Colour::WHITE);
        // 20x10 cells give 40x40 braille dots: one pixel per dot, no padding
        let lines = braille_lines(&raster, Colour::BLACK, 20, 10);
        let first = lines[0].spans[1].content.chars().next().unwrap();
        assert_eq!(first, '\u{2801}');
    }
}
