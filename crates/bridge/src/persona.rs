//! Persona-Instruktion des Coaches
//!
//! Baut die System-Instruktion die beim Session-Aufbau an den
//! Live-Endpunkt geht. Der Basistext ist Portugiesisch (Produktsprache);
//! die aktive Anzeigesprache wird benannt und als Antwortsprache
//! erzwungen. Im Voice-Modus kommt ein Suffix dazu.

use coachcall_core::Language;

/// Antwortsprache wie sie in der Instruktion erzwungen wird
fn antwort_sprache(lang: Language) -> &'static str {
    match lang {
        Language::Pt => "Português",
        Language::En => "English",
        Language::Es => "Español",
    }
}

/// Basis-Persona des Coaches, parametrisiert mit der Anzeigesprache
pub fn system_instruction(lang: Language) -> String {
    format!(
        "\
Você é o \"CoachCall\", um consultor de elite, carismático e sofisticado.
Idioma atual: {idioma}.
Responda SEMPRE no idioma: {resposta}.

Diretrizes:
- Você é um mestre em psicologia social e carisma.
- Ajude o usuário a superar a timidez com dicas práticas de conversa e linguagem corporal.
- Responda de forma elegante, curta e direta.
",
        idioma = lang.anzeige_name(),
        resposta = antwort_sprache(lang),
    )
}

/// Persona fuer den Voice-Call-Modus (Basis + Voice-Suffix)
pub fn voice_instruction(lang: Language) -> String {
    format!("{}\nVoice call mode enabled.", system_instruction(lang))
}
