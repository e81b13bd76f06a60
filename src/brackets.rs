//! Bracket nesting levels for rainbow bracket rendering.
//!
//! Each bracket character is assigned a color level derived from nesting
//! depth, adjusted by sibling position inside arrays so consecutive array
//! elements at the same depth still get visually distinct colors. Closing
//! brackets inherit the level of their matching opener.

use std::collections::HashMap;

/// Number of colors in the repeating bracket palette.
pub const PALETTE_SIZE: usize = 8;

/// One bracket occurrence on a line, in left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSpan {
    pub char: char,
    pub level: usize,
    /// Character position within the raw line.
    pub position: usize,
}

impl BracketSpan {
    /// Palette slot for rendering.
    pub fn palette_index(&self) -> usize {
        self.level % PALETTE_SIZE
    }
}

/// Bracket spans keyed by line number; only lines with brackets appear.
pub type BracketLevelMap = HashMap<usize, Vec<BracketSpan>>;

struct OpenEntry {
    level: usize,
}

/// Scan all lines once and assign every bracket its color level.
pub fn calculate_bracket_levels(lines: &[String]) -> BracketLevelMap {
    let mut map = BracketLevelMap::new();
    let mut current_level: usize = 0;
    let mut stack: Vec<OpenEntry> = Vec::new();
    // One element counter per open array, innermost last.
    let mut array_element_indices: Vec<usize> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        let mut brackets: Vec<BracketSpan> = Vec::new();

        // A fresh array element after a comma bumps the sibling counter,
        // which is what separates the colors of consecutive elements.
        if !array_element_indices.is_empty()
            && starts_array_element(trimmed)
            && index > 0
            && lines[index - 1].trim().ends_with(',')
        {
            if let Some(counter) = array_element_indices.last_mut() {
                *counter += 1;
            }
        }

        for (position, ch) in line.chars().enumerate() {
            match ch {
                '{' | '[' => {
                    let mut color_level = current_level;
                    if let Some(&element_index) = array_element_indices.last() {
                        color_level = current_level + element_index;
                    }

                    brackets.push(BracketSpan { char: ch, level: color_level, position });
                    stack.push(OpenEntry { level: color_level });

                    if ch == '[' {
                        array_element_indices.push(0);
                    }
                    current_level += 1;
                }
                '}' | ']' => {
                    current_level = current_level.saturating_sub(1);

                    match stack.pop() {
                        Some(opener) => {
                            brackets.push(BracketSpan {
                                char: ch,
                                level: opener.level,
                                position,
                            });
                            if ch == ']' {
                                array_element_indices.pop();
                            }
                        }
                        // Unbalanced input; keep going with the raw depth.
                        None => {
                            brackets.push(BracketSpan {
                                char: ch,
                                level: current_level,
                                position,
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        if !brackets.is_empty() {
            map.insert(line_number, brackets);
        }
    }

    map
}

/// Does the trimmed line begin a new array element?
fn starts_array_element(trimmed: &str) -> bool {
    trimmed.starts_with('{')
        || trimmed.starts_with('[')
        || trimmed.starts_with('"')
        || trimmed.chars().next().is_some_and(|c| c.is_ascii_digit())
        || trimmed.starts_with("true")
        || trimmed.starts_with("false")
        || trimmed.starts_with("null")
}
