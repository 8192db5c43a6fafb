//! # Default Game State
//!
//! The initial tree every session starts from, and the schema the default
//! validator checks value kinds against.
//!
//! ```text
//! root
//! ├── game      run state: phase, score, lives, level, in-run player, boss
//! ├── player    persistent profile: name, unlocks, achievements
//! ├── audio     current track and mute flag
//! ├── settings  volumes, difficulty, display toggles
//! ├── story     chapter progress and unlocked logs
//! └── ui        active screen and overlay flags
//! ```

use serde_json::{json, Value};

pub fn default_game_state() -> Value {
    json!({
        "game": {
            "phase": "menu",
            "paused": false,
            "score": 0,
            "highScore": 0,
            "level": 1,
            "lives": 3,
            "combo": 0,
            "player": {
                "health": 100,
                "maxHealth": 100,
                "shield": 0,
                "weapon": "blaster",
                "position": { "x": 0, "y": 0 },
                "powerups": [],
                "invulnerable": false
            },
            "boss": {
                "active": false,
                "name": null,
                "health": 0,
                "maxHealth": 0
            }
        },
        "player": {
            "name": "Pilot",
            "unlockedWeapons": ["blaster"],
            "achievements": [],
            "totalKills": 0
        },
        "audio": {
            "currentTrack": null,
            "muted": false
        },
        "settings": {
            "masterVolume": 0.8,
            "musicVolume": 0.6,
            "sfxVolume": 0.9,
            "difficulty": "normal",
            "showFps": false,
            "screenShake": true
        },
        "story": {
            "chapter": 0,
            "unlockedLogs": [],
            "seenDialogues": [],
            "currentDialogue": null
        },
        "ui": {
            "screen": "title",
            "journalOpen": false,
            "notifications": []
        }
    })
}
