//! Difficulty levels and their fixed tutor prompts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const BEGINNER_PROMPT: &str = "너는 초등학교 1-3학년 아이들이 성장할 수 있게 도와주는 친절한 과학 선생님이야. 아주 간단하고 친근한 예시(장난감, 동물, 음식 등)를 들어서 설명해주고, 아이들이 깨닫을 수 있게 질문을 계속 던져줘. 과학의 기본 개념을 쉽게 이해할 수 있도록 도와주세요.";

const INTERMEDIATE_PROMPT: &str = "너는 초등학교 4-6학년 아이들이 성장할 수 있게 도와주는 과학 선생님이야. 아이들의 수준을 파악해서 답을 알려주기 보다는 조금 위 수준을 알려주고 그러다 보면 아이들이 깨닫을 수 있게 질문을 계속 던져줘. 재미있는 예시와 함께 과학 이론을 설명하세요.";

const ADVANCED_PROMPT: &str = "너는 초등학교 고학년 아이들이 더 깊이 있게 과학을 이해할 수 있게 도와주는 과학 선생님이야. 아이들의 호기심을 자극하는 질문을 던지고, 실험적 사고를 격려하며, 과학의 연결성을 보도록 도와줘. 복잡한 개념도 단계적으로 설명해주세요.";

/// How demanding the tutor's explanations are.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Grades 1 to 3.
    Beginner,
    /// Grades 4 to 6.
    #[default]
    Intermediate,
    /// Upper elementary, deeper explanations.
    Advanced,
}

impl Difficulty {
    /// Every level, easiest first.
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// The fixed system prompt for this level.
    pub const fn system_prompt(self) -> &'static str {
        match self {
            Difficulty::Beginner => BEGINNER_PROMPT,
            Difficulty::Intermediate => INTERMEDIATE_PROMPT,
            Difficulty::Advanced => ADVANCED_PROMPT,
        }
    }

    /// A short label for menus and status lines.
    pub const fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner (easy)",
            Difficulty::Intermediate => "Intermediate (just right)",
            Difficulty::Advanced => "Advanced (challenging)",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "easy" | "1" | "초급" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" | "2" | "중급" => Ok(Difficulty::Intermediate),
            "advanced" | "hard" | "3" | "고급" => Ok(Difficulty::Advanced),
            _ => Err(format!(
                "unknown difficulty '{s}' (expected beginner, intermediate or advanced)"
            )),
        }
    }
}

/// Parse a difficulty selector where `off`, `free` or `none` selects free configuration.
pub fn parse_level(s: &str) -> Result<Option<Difficulty>, String> {
    match s.trim().to_lowercase().as_str() {
        "off" | "free" | "none" => Ok(None),
        _ => s.parse::<Difficulty>().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_level_has_a_distinct_prompt() {
        let prompts: Vec<_> = Difficulty::ALL.iter().map(|d| d.system_prompt()).collect();
        assert_eq!(prompts[0], BEGINNER_PROMPT);
        assert_eq!(prompts[1], INTERMEDIATE_PROMPT);
        assert_eq!(prompts[2], ADVANCED_PROMPT);
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
    }

    #[test]
    fn prompt_lookup_is_stable() {
        for level in Difficulty::ALL {
            assert_eq!(level.system_prompt(), level.system_prompt());
            assert_eq!(level.to_string().parse::<Difficulty>(), Ok(level));
        }
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("1".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert_eq!(" Hard ".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        assert_eq!("중급".parse::<Difficulty>(), Ok(Difficulty::Intermediate));
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn parse_level_allows_free_mode() {
        assert_eq!(parse_level("off"), Ok(None));
        assert_eq!(parse_level("FREE"), Ok(None));
        assert_eq!(parse_level("beginner"), Ok(Some(Difficulty::Beginner)));
        assert!(parse_level("wizard").is_err());
    }

    #[test]
    fn beginner_prompt_is_the_fixed_table_entry() {
        assert_eq!(
            Difficulty::Beginner.system_prompt(),
            "너는 초등학교 1-3학년 아이들이 성장할 수 있게 도와주는 친절한 과학 선생님이야. 아주 간단하고 친근한 예시(장난감, 동물, 음식 등)를 들어서 설명해주고, 아이들이 깨닫을 수 있게 질문을 계속 던져줘. 과학의 기본 개념을 쉽게 이해할 수 있도록 도와주세요."
        );
        assert!(Difficulty::Intermediate.system_prompt().starts_with("너는 초등학교 4-6학년"));
        assert!(Difficulty::Advanced.system_prompt().starts_with("너는 초등학교 고학년"));
    }

    #[test]
    fn default_is_intermediate() {
        assert_eq!(Difficulty::default(), Difficulty::Intermediate);
    }
}
