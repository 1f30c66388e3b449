mod configuration;
mod contracts;
mod federation;
mod normalization;
mod resolvability;
