pub mod calibrator;
