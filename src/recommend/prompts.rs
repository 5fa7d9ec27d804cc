//! Prompt templates for the recommendation service
//!
//! The service is prompted in Spanish, matching the language of the lab
//! reports and of the engineers reading the output. Few-shot examples pin
//! the register: terse diagnosis, concrete maintenance action, ≤150 words.

use crate::types::BreachRecord;

/// System prompt defining the assistant's role and constraints.
pub const SYSTEM_PROMPT: &str = "Eres un ingeniero mecánico, especialista en equipos mineros y \
debes realizar diagnósticos precisos sobre las medidas de un equipo, entregando comentarios \
breves respecto a los análisis de aceite realizados y recomendaciones concretas de mantención. \
Considera que al haber presencia de Zinc, Bario, Boro, Calcio, Molibdeno, Magnesio o Fósforo en \
el aceite no se debe sugerir cambio de componentes o de aceite. Tus respuestas deben ser de 150 \
palabras o menos.";

/// Few-shot exchanges: (user, assistant) pairs.
pub const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Analiza una muestra para el siguiente equipo:\n\
         Componente: aceite motor diesel 15w40\n\n\
         Los valores de la muestra son:\n\
         Contenido de agua    8.3    Condenatorio    0.3\n\
         Viscosidad cinematica @ 40C    144.6    Condenatorio    138.0",
        "Se aprecian niveles de desgaste y contaminación externa entre límites permisibles, sin \
         embargo, se detecta contenido de agua 8,3% en volumen de muestra. Grado de viscosidad \
         sobre límite superior condenatorio 144,6 por posibles rellenos con lubricante de ISO VG \
         mayor.\nSe sugiere cambio de lubricante y mantener seguimiento riguroso cada 125 horas, \
         para evidenciar alzas abruptas de sodio y potasio por eventual traspaso de refrigerante. \
         Monitorear consumos de aceite y gases blancos en salida de escape.",
    ),
    (
        "Analiza una muestra para el siguiente equipo:\n\
         Componente: motor diesel\n\
         Máquina: camion tolva\n\n\
         Los valores de la muestra son:\n\
         Fierro    31.1    Marginal    30.0\n\
         Cobre    267.7    Condenatorio    15.0\n\
         Estano    2.9    Marginal    1.5\n\
         Silicio    30.7    Condenatorio    17.0\n\
         Indice PQ    20.0    Marginal    20.0",
        "Se detecta concentración de metales de desgaste por Fierro 31.1 ppm y Cobre 267.7 ppm, \
         evidenciando posible abrasión excesiva en cojinetes y bujes de turbo. Silicio 30.7 ppm \
         señala ingesta excesiva de polvo ambiental. Análisis fisicoquímico detecta material \
         ferroso en suspensión Índice PQ 20.0.\nSe recomienda priorizar cambio de lubricante y \
         elementos filtrantes, evaluar presiones en sistema de lubricación y saturación temprana \
         de filtros, mantener seguimiento riguroso cada 50 hrs.",
    ),
    (
        "Analiza una muestra para el siguiente equipo:\n\
         Componente: motor diesel cummins\n\
         Máquina: camion komatsu 730-e de extraccion\n\n\
         Los valores de la muestra son:\n\
         Dilucion por combustible    2.2    Condenatorio    0.3",
        "Niveles de desgaste y contaminaciones determinadas por espectrometría en tamaño y \
         concentraciones admisibles para la operación, sin embargo, análisis físico químico \
         detecta Dilución por combustible 2.2%, altamente perjudicial para la operación, \
         evidenciando posibles anomalías en toberas o sellos de inyectores. Grado de viscosidad \
         normal en lubricante.\nSe sugiere priorizar intervención mecánica y efectuar cambio de \
         lubricante, junto con envío de contramuestra para realizar seguimiento a deterioro en \
         sellos/toberas de inyectores o bomba de transferencia.",
    ),
];

/// Render the per-sample analysis prompt: equipment identity plus the table
/// of breached essays (name, value, tier reached, bound breached).
pub fn analysis_prompt(
    component: &str,
    machine: &str,
    machine_model: Option<&str>,
    breaches: &[BreachRecord],
) -> String {
    let mut table = String::new();
    if breaches.is_empty() {
        table.push_str("No hay ensayos fuera de límite");
    } else {
        for b in breaches {
            table.push_str(&format!(
                "{}    {}    {}    {}\n",
                b.essay, b.value, b.tier, b.limit
            ));
        }
    }

    let machine_line = match machine_model {
        Some(model) => format!("{} - {}", machine.to_lowercase(), model.to_uppercase()),
        None => machine.to_lowercase(),
    };

    format!(
        "Analiza una muestra para el siguiente equipo:\n\
         Componente: {}\n\
         Máquina: {}\n\n\
         Los valores de la muestra son:\n\
         {}",
        component.to_lowercase(),
        machine_line,
        table.trim_end()
    )
}
