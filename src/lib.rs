//! Rozwiązywanie kształtów krajów i odwzorowanie Equal Earth.
//!
//! Kod alpha-2 → cecha z topologii world-atlas → projekcja dopasowana do
//! płótna świata albo do kontenera jednego kraju → ścieżka SVG.

pub mod data;
pub mod interaction;
pub mod iso;
pub mod locate;
pub mod path;
pub mod projection;
pub mod resource;
pub mod svg;
pub mod topology;
pub mod viewport;
pub mod views;
