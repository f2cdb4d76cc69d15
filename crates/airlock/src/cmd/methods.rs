use airlock_rpc::Resolve;

use crate::cmd::MethodsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_methods, OutputFormat};

pub fn run(args: MethodsArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = args.handler.registry();
    let names = registry.method_names();
    print_methods(args.handler.name(), &names, format);
    Ok(SUCCESS)
}
