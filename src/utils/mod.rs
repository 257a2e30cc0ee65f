mod markup;
mod path_utils;
mod subprocess;

pub use markup::escape_html;

pub use path_utils::expand_and_resolve;
pub use path_utils::with_suffix;

pub use subprocess::check_bowtie;
pub use subprocess::check_software;
pub use subprocess::command_to_string;
pub use subprocess::run_checked;
