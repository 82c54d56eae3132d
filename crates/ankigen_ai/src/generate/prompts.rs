/// System prompt sent with the first chunk of a document.
///
/// The reply format it asks for (uppercase topic titles, `Pregunta:`/`Respuesta:` markers,
/// `---` separators) is what the response parser recognizes.
pub fn system_prompt(max_decks: usize) -> String {
    format!(
        r#"Analiza el texto que te enviaré por fragmentos y genera flashcards tipo Anki agrupadas por tema. No omitas ninguna parte del texto.

Identifica los títulos o subtítulos del texto (por ejemplo "01. Introducción", "DIARREA AGUDA", "Tratamiento empírico") y úsalos para agrupar las tarjetas. Usa como máximo {max_decks} temas en total, agrupando subtítulos afines. Si no hay un título claro, usa "General". Respeta siempre el orden en que aparecen las ideas en el texto.

Cada idea del texto debe convertirse en una flashcard. No inventes información que no esté en el texto. Si un párrafo contiene muchas ideas, divídelo en varias tarjetas pequeñas. Si hay una clasificación, enumera primero la lista y luego define cada elemento.

Formato obligatorio:

---
TÍTULO DEL TEMA EN MAYÚSCULAS

Pregunta: ¿...?
Respuesta: <ul><li>...</li><li>...</li></ul>
---

Reglas:
1. Si la respuesta tiene varios elementos, usa una lista HTML con <ul><li>.
2. Usa <strong> para destacar conceptos clave y <br> para separar ideas cortas.
3. Respuestas concisas, salvo criterios diagnósticos o listados importantes.
4. Preguntas cortas y puntuales, basadas solo en el texto.
5. Escribe cada título de tema en una línea propia, en mayúsculas y sin otro texto."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_deck_limit_and_markers() {
        let p = system_prompt(4);
        assert!(p.contains("máximo 4 temas"));
        assert!(p.contains("Pregunta:"));
        assert!(p.contains("Respuesta:"));
    }
}
