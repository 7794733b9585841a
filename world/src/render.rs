//! Human-readable dump of the whole world for logs and debugging.

use std::fmt;

use crate::World;

const HEADER: &str = "Game World Details ---------------------------------";

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        writeln!(f, "State: {}", self.state)?;
        writeln!(f)?;

        if let Some(map) = &self.map {
            writeln!(f, "Map: {map}")?;
        }
        section(f, "Players:", &self.players)?;
        section(f, "Bricks:", &self.bricks)?;
        writeln!(f)?;
        section(f, "Coins:", &self.coins)?;
        writeln!(f)?;
        section(f, "Life pack:", &self.life_packs)?;
        writeln!(f)
    }
}

fn section<T: fmt::Display>(f: &mut fmt::Formatter<'_>, title: &str, items: &[T]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{title}")?;
    for item in items {
        writeln!(f, "  {item}")?;
    }
    Ok(())
}
