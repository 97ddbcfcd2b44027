use serde::Serialize;
use utoipa::ToSchema;

/// Panel a client should display for one player, with the data it needs.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PhaseView {
    /// Form collecting the player's three decks.
    #[serde(rename_all = "camelCase")]
    SubmitForm {
        player: u8,
    },
    /// Host waiting for the guest, with the link to share.
    #[serde(rename_all = "camelCase")]
    WaitingRoom {
        player: u8,
        link: String,
    },
    /// The opponent has something to do first.
    #[serde(rename_all = "camelCase")]
    Waiting {
        for_player: u8,
    },
    /// Opponent's decks to pick a ban from.
    #[serde(rename_all = "camelCase")]
    BanPhase {
        decks: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        banned_deck: Option<String>,
        /// This player banned and the opponent has not yet.
        is_waiting: bool,
    },
    /// Final screen with both players' decks and bans.
    #[serde(rename_all = "camelCase")]
    Results {
        player1_decks: Vec<String>,
        player2_decks: Vec<String>,
        player1_banned_deck: String,
        player2_banned_deck: String,
    },
}

/// View response bundling the rendered panel with the revision it was rendered from.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub game_id: String,
    pub revision: String,
    pub view: PhaseView,
}
