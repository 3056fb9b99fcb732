use colored::*;

use crate::terminal::print;

const BANNER_0: &str = r#"
     ███╗   ███╗████████╗███████╗ ██████╗ █████╗ ███╗   ██╗
     ████╗ ████║╚══██╔══╝██╔════╝██╔════╝██╔══██╗████╗  ██║
     ██╔████╔██║   ██║   ███████╗██║     ███████║██╔██╗ ██║
     ██║╚██╔╝██║   ██║   ╚════██║██║     ██╔══██║██║╚██╗██║
     ██║ ╚═╝ ██║   ██║   ███████║╚██████╗██║  ██║██║ ╚████║
     ╚═╝     ╚═╝   ╚═╝   ╚══════╝ ╚═════╝╚═╝  ╚═╝╚═╝  ╚═══╝
"#;

const BANNER_1: &str = r#"
            __  _____________ _________    _   __
           /  |/  /_  __/ ___// ____/   |  / | / /
          / /|_/ / / /  \__ \/ /   / /| | /  |/ /
         / /  / / / /  ___/ / /___/ ___ |/ /|  /
        /_/  /_/ /_/  /____/\____/_/  |_/_/ |_/
"#;

const BANNER_2: &str = r#"
              __  __ _____ ____   ____    _    _   _
             |  \/  |_   _/ ___| / ___|  / \  | \ | |
             | |\/| | | | \___ \| |     / _ \ |  \| |
             | |  | | | |  ___) | |___ / ___ \| |\  |
             |_|  |_| |_| |____/ \____/_/   \_\_| \_|
"#;

pub fn print() {
    let n: u8 = rand::random_range(0..=2);
    let art: ColoredString = match n {
        0 => BANNER_0.red(),
        1 => BANNER_1.truecolor(255, 165, 0),
        _ => BANNER_2.green(),
    };
    print::print(&format!("{}", art));
}
