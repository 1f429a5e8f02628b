use anyhow::Result;
use std::path::Path;
use std::time::Instant;

use crate::session::{SaveOutcome, Session};
use crate::theme::Theme;

/// Vim-style `:` commands for driving a session from a prompt.
/// Tab numbers are 1-based, as shown by `:tabs`.
pub struct CommandProcessor;

impl CommandProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute_command(
        &self,
        command: &str,
        session: &mut Session,
        now: Instant,
        should_quit: &mut bool,
    ) -> Result<String> {
        let cmd = command.trim().trim_start_matches(':');
        if cmd.is_empty() {
            return Ok(String::new());
        }

        let (name, rest) = match cmd.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (cmd, ""),
        };

        match name {
            "e" | "edit" => {
                require(rest)?;
                let index = session.open_external(Path::new(rest))?;
                Ok(format!("Tab {}: {}", index + 1, describe(session, index)))
            }
            "new" => {
                require(rest)?;
                match session.create_new(rest)? {
                    Some(index) => Ok(format!("Created {}", describe(session, index))),
                    None => Err(anyhow::anyhow!("E32: Invalid file name: {}", rest)),
                }
            }
            "enew" => {
                let index = session.new_untitled();
                Ok(format!("Tab {}: [No Name]", index + 1))
            }
            "w" | "write" | "saveas" => {
                let index = active(session)?;
                if !rest.is_empty() {
                    session.save_as(index, Path::new(rest))?;
                    return Ok(format!("Written {}", describe(session, index)));
                }
                match session.save(index)? {
                    SaveOutcome::Saved => Ok(format!("Written {}", describe(session, index))),
                    SaveOutcome::NeedsPath => Err(anyhow::anyhow!("E32: No file name")),
                    SaveOutcome::Skipped => Ok(String::new()),
                }
            }
            "close" | "bd" => {
                let index = if rest.is_empty() {
                    active(session)?
                } else {
                    tab_number(rest)?
                };
                session.close_tab(index)?;
                Ok(format!("{} tab(s) open", session.tab_count()))
            }
            "tab" | "b" => {
                let index = tab_number(rest)?;
                session.switch_to(index);
                match session.active_index() {
                    Some(index) => Ok(format!("Tab {}: {}", index + 1, describe(session, index))),
                    None => Ok("No tab selected".to_string()),
                }
            }
            "move" => {
                let mut parts = rest.split_whitespace();
                let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
                    return Err(anyhow::anyhow!("E471: Argument required"));
                };
                session.move_tab(tab_number(from)?, tab_number(to)?);
                Ok(tab_list(session))
            }
            "rm" | "delete" => {
                let target = if rest.is_empty() {
                    session
                        .listing()
                        .selected()
                        .map(str::to_string)
                        .ok_or_else(|| anyhow::anyhow!("E471: Argument required"))?
                } else {
                    rest.to_string()
                };
                session.delete_file(Path::new(&target))?;
                Ok(format!("Deleted {}", target))
            }
            "cd" => {
                require(rest)?;
                session.open_folder(Path::new(rest))?;
                Ok(session.workdir().display().to_string())
            }
            "ls" => {
                let selected = session.listing().selected();
                let lines: Vec<String> = session
                    .listing()
                    .entries()
                    .iter()
                    .map(|entry| {
                        let marker = if Some(entry.as_str()) == selected { ">" } else { " " };
                        format!("{} {}", marker, entry)
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "tabs" | "buffers" => Ok(tab_list(session)),
            "theme" => {
                if rest.is_empty() {
                    return Ok(session.theme().to_string());
                }
                let theme = Theme::from_name(rest)
                    .ok_or_else(|| anyhow::anyhow!("E185: Cannot find theme {}", rest))?;
                session.set_theme(theme);
                Ok(format!("Theme: {}", theme))
            }
            "font" => {
                let Some((family, size)) = rest.rsplit_once(char::is_whitespace) else {
                    let (family, size) = session.font();
                    return Ok(format!("{} {}pt", family, size));
                };
                let size: u16 = size.parse()?;
                session.set_font(family, size);
                let (family, size) = session.font();
                Ok(format!("Font: {} {}pt", family, size))
            }
            "img" => {
                require(rest)?;
                let index = active(session)?;
                let reference = session.insert_image(index, Path::new(rest), now)?;
                Ok(format!("Inserted {}", reference))
            }
            "append" => {
                let index = active(session)?;
                session.append_text(index, &format!("{}\n", unescape(rest)), now);
                Ok(String::new())
            }
            "set" => {
                let index = active(session)?;
                session.set_text(index, &unescape(rest), now);
                Ok(String::new())
            }
            "scroll" => {
                let index = active(session)?;
                let y: u32 = rest.parse()?;
                session.set_scroll_position(index, y);
                Ok(String::new())
            }
            "preview" => {
                let tab = session
                    .active_tab()
                    .ok_or_else(|| anyhow::anyhow!("No tab selected"))?;
                Ok(tab.cached_markup().to_string())
            }
            "status" => Ok(session.status().render_line()),
            "q" | "quit" => {
                *should_quit = true;
                Ok("Quitting".to_string())
            }
            _ => Err(anyhow::anyhow!("E492: Not an editor command: {}", name)),
        }
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn require(arg: &str) -> Result<()> {
    if arg.is_empty() {
        return Err(anyhow::anyhow!("E471: Argument required"));
    }
    Ok(())
}

fn active(session: &Session) -> Result<usize> {
    session
        .active_index()
        .ok_or_else(|| anyhow::anyhow!("No tab selected"))
}

fn tab_number(arg: &str) -> Result<usize> {
    let number: usize = arg.trim().parse()?;
    // 0 maps past the end, which callers treat as "no tab"
    Ok(number.checked_sub(1).unwrap_or(usize::MAX))
}

fn describe(session: &Session, index: usize) -> String {
    session
        .tab(index)
        .map(|tab| match tab.path() {
            Some(path) => path.display().to_string(),
            None => "[No Name]".to_string(),
        })
        .unwrap_or_default()
}

fn tab_list(session: &Session) -> String {
    let active = session.active_index();
    let lines: Vec<String> = session
        .tabs()
        .iter()
        .enumerate()
        .map(|(index, tab)| {
            let marker = if Some(index) == active { "%" } else { " " };
            let dirty = if tab.is_dirty() { "+" } else { " " };
            format!("{}{} {} {}", marker, dirty, index + 1, tab.display_name())
        })
        .collect();
    lines.join("\n")
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}
