use crate::game::GameState;
use crate::session::{Role, View};

fn role_label(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Host) => "host (X)",
        Some(Role::Guest) => "guest (O)",
        Some(Role::Spectator) => "spectator",
        None => "joining",
    }
}

pub fn board_lines(state: &GameState) -> Vec<String> {
    let cells: Vec<char> = state
        .cells()
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Some(mark) => mark.symbol(),
            None => char::from(b'0' + i as u8),
        })
        .collect();

    let mut lines = Vec::with_capacity(5);
    for (row, chunk) in cells.chunks(3).enumerate() {
        if row > 0 {
            lines.push("---+---+---".to_string());
        }
        lines.push(format!(" {} | {} | {} ", chunk[0], chunk[1], chunk[2]));
    }
    lines
}

pub fn render_view(view: &View) -> String {
    let mut out = format!("match {} | you are {}\n", view.match_id, role_label(view.role));
    for line in board_lines(&view.state) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&view.status);
    out.push('\n');
    out
}
