pub mod surface_analyzer;
