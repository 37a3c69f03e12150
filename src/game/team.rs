//! Teams and the team colour palette

use std::fmt;

use crate::host::PlayerId;

/// Colour code prefix understood by the host's chat renderer
pub const COLOR_CHAR: char = '§';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamColor {
    Navy,
    Blue,
    Cyan,
    Aqua,
    Fire,
    Red,
    Yellow,
    Gold,
    Lime,
    Green,
    Purple,
    Pink,
    White,
    Silver,
    Gray,
    Black,
}

impl TeamColor {
    pub const ALL: [TeamColor; 16] = [
        TeamColor::Navy,
        TeamColor::Blue,
        TeamColor::Cyan,
        TeamColor::Aqua,
        TeamColor::Fire,
        TeamColor::Red,
        TeamColor::Yellow,
        TeamColor::Gold,
        TeamColor::Lime,
        TeamColor::Green,
        TeamColor::Purple,
        TeamColor::Pink,
        TeamColor::White,
        TeamColor::Silver,
        TeamColor::Gray,
        TeamColor::Black,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TeamColor::Navy => "navy",
            TeamColor::Blue => "blue",
            TeamColor::Cyan => "cyan",
            TeamColor::Aqua => "aqua",
            TeamColor::Fire => "fire",
            TeamColor::Red => "red",
            TeamColor::Yellow => "yellow",
            TeamColor::Gold => "gold",
            TeamColor::Lime => "lime",
            TeamColor::Green => "green",
            TeamColor::Purple => "purple",
            TeamColor::Pink => "pink",
            TeamColor::White => "white",
            TeamColor::Silver => "silver",
            TeamColor::Gray => "gray",
            TeamColor::Black => "black",
        }
    }

    /// Host colour code digit
    pub fn code(self) -> char {
        match self {
            TeamColor::Navy => '1',
            TeamColor::Blue => '9',
            TeamColor::Cyan => '3',
            TeamColor::Aqua => 'b',
            TeamColor::Fire => '4',
            TeamColor::Red => 'c',
            TeamColor::Yellow => 'e',
            TeamColor::Gold => '6',
            TeamColor::Lime => '2',
            TeamColor::Green => 'a',
            TeamColor::Purple => '5',
            TeamColor::Pink => 'd',
            TeamColor::White => 'f',
            TeamColor::Silver => '7',
            TeamColor::Gray => '8',
            TeamColor::Black => '0',
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COLOR_CHAR}{}", self.code())
    }
}

/// A team inside a running match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    name: String,
    players: Vec<PlayerId>,
    points: u32,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            players: Vec::new(),
            points: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn size(&self) -> usize {
        self.players.len()
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn has(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn color(&self) -> Option<TeamColor> {
        TeamColor::from_name(&self.name)
    }

    /// Name wrapped in the team colour, when the name is a palette colour
    pub fn display_name(&self) -> String {
        match self.color() {
            Some(color) => format!("{color}{}{}", self.name, TeamColor::White),
            None => self.name.clone(),
        }
    }

    pub(crate) fn add_player(&mut self, player: PlayerId) {
        if !self.has(player) {
            self.players.push(player);
        }
    }

    pub(crate) fn remove_player(&mut self, player: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| *p != player);
        before != self.players.len()
    }

    pub(crate) fn add_point(&mut self) {
        self.points = self.points.saturating_add(1);
    }

    pub(crate) fn reset_points(&mut self) {
        self.points = 0;
    }
}
