//! Prompt construction for debate turns.
//!
//! Builds the system and user messages sent to the generation service
//! for each turn, plus the fallback placeholder used when generation
//! fails outright.

use crate::config::DebateConfig;
use crate::state::{Message, Speaker, TurnKind};

/// Instruction block for each phase of the debate.
fn turn_instructions(kind: TurnKind) -> &'static str {
    match kind {
        TurnKind::Opening => {
            "OPENING STATEMENT INSTRUCTIONS:\n\
             - Present your main thesis and 2-3 key supporting arguments\n\
             - Set the framework for how you'll approach this debate\n\
             - Be compelling and establish your credibility\n\
             - Do not yet respond to arguments your opponent has not made"
        }
        TurnKind::Rebuttal => {
            "REBUTTAL INSTRUCTIONS:\n\
             - This is a REBUTTAL - jump straight into addressing your opponent's arguments\n\
             - No formal openings like \"Ladies and gentlemen\" - you're responding directly\n\
             - Point out specific flaws, contradictions, or weaknesses in their reasoning\n\
             - Present counter-evidence or alternative interpretations\n\
             - Reference specific points they made and explain why they're wrong"
        }
        TurnKind::Closing => {
            "CLOSING ARGUMENT INSTRUCTIONS:\n\
             - Summarize your strongest points from the entire debate\n\
             - Highlight where you successfully countered your opponent\n\
             - End with a memorable conclusion that reinforces your thesis\n\
             - This is your last chance to persuade - make it count"
        }
    }
}

/// Build the system prompt for the debater speaking turn `turn_index`.
pub fn system_prompt(config: &DebateConfig, turn_index: usize) -> String {
    let speaker = Speaker::for_turn(turn_index);
    let kind = TurnKind::for_turn(turn_index, config.max_turns);
    let round = turn_index / 2 + 1;

    let (own, opponent) = match speaker {
        Speaker::DebaterA => (&config.persona_a, &config.persona_b),
        Speaker::DebaterB => (&config.persona_b, &config.persona_a),
    };

    format!(
        "You are an expert debater participating in a structured debate.\n\n\
         DEBATE TOPIC: {topic}\n\n\
         YOUR POSITION: {own_stance}\n\
         OPPONENT'S POSITION: {opponent_stance}\n\n\
         DEBATE STRUCTURE:\n\
         - Total turns per debater: {max_turns}\n\
         - Current turn: {round}\n\
         - Turn type: {kind}\n\n\
         ROLE AND BEHAVIOR:\n\
         - You are {name} in this debate; your opponent is {opponent_name}\n\
         - Defend your position with logical arguments, evidence, and persuasive rhetoric\n\
         - Address your opponent's points directly once they have been made\n\
         - Stay focused on the topic with a respectful but assertive tone\n\
         - Pace your arguments: this is turn {round} of {max_turns}\n\n\
         {style}\n\n\
         {instructions}\n\n\
         CRITICAL OUTPUT RULES:\n\
         - Output ONLY your spoken words - no scene directions or stage actions\n\
         - Do NOT include narration, gestures, or text in parentheses\n\
         - Do NOT use asterisks or any markdown formatting\n\
         - You are speaking aloud: make the response suitable for audio presentation",
        topic = config.topic,
        own_stance = own.stance,
        opponent_stance = opponent.stance,
        max_turns = config.max_turns,
        round = round,
        kind = kind.display_name(),
        name = own.name,
        opponent_name = opponent.name,
        style = config.format.style_instructions(),
        instructions = turn_instructions(kind),
    )
}

/// Build the user message carrying the transcript generated so far.
pub fn user_prompt(config: &DebateConfig, transcript: &[Message]) -> String {
    if transcript.is_empty() {
        return "Begin your opening statement.".to_string();
    }

    let history = transcript
        .iter()
        .map(|message| {
            let persona = match message.speaker {
                Speaker::DebaterA => &config.persona_a,
                Speaker::DebaterB => &config.persona_b,
            };
            format!("{}: {}", persona.name, message.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Here is the debate so far:\n\n{history}\n\nNow it's your turn to respond.")
}

/// Placeholder text delivered when generation fails after all retries.
/// The turn is marked degraded; the debate proceeds rather than halting.
pub fn fallback_text(config: &DebateConfig, turn_index: usize) -> String {
    let speaker = Speaker::for_turn(turn_index);
    let persona = match speaker {
        Speaker::DebaterA => &config.persona_a,
        Speaker::DebaterB => &config.persona_b,
    };
    match TurnKind::for_turn(turn_index, config.max_turns) {
        TurnKind::Opening => format!(
            "I'm {}, and I strongly believe that {}. Throughout this debate I will \
             demonstrate why this position is not only logical but necessary for our \
             understanding of {}.",
            persona.name, persona.stance, config.topic
        ),
        TurnKind::Rebuttal => format!(
            "While my opponent raises some points, I must respectfully disagree. The \
             evidence clearly supports {}, and the arguments presented so far only \
             strengthen my position.",
            persona.stance
        ),
        TurnKind::Closing => format!(
            "In conclusion, I have demonstrated that {} is the most reasonable and \
             well-supported position on {}. The arguments presented today clearly \
             favor my stance.",
            persona.stance, config.topic
        ),
    }
}
