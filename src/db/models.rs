/// Database row types for all tables.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// User record in the users table
#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

/// Challenge lifecycle states. A challenge is created pending and moved
/// to exactly one terminal state by the recipient's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Declined,
}

impl ChallengeStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

/// Challenge record in the challenges table
#[derive(Debug, Clone)]
pub struct ChallengeRow {
    pub challenge_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub status: ChallengeStatus,
    pub created_at: String,
}

/// Game lifecycle states. Won and Drawn are terminal: no further moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Active,
    Won,
    Drawn,
}

impl GameStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "won" => Some(Self::Won),
            "drawn" => Some(Self::Drawn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Won => "won",
            Self::Drawn => "drawn",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Game record in the games table. `board` holds the 6x7 grid as JSON.
#[derive(Debug, Clone)]
pub struct GameRow {
    pub game_id: i64,
    pub player1_id: i64,
    pub player2_id: i64,
    pub board: String,
    pub current_turn: i64,
    pub status: GameStatus,
    pub winner_id: Option<i64>,
    pub created_at: String,
}
