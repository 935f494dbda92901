pub mod random_samples;
