mod relay;
mod support;
